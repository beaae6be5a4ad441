#![doc = include_str!("../README.md")]
pub mod app;
pub mod asr;
pub mod audio;
pub mod clock;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod janitor;
pub mod listener;
pub mod llm;
pub mod logging;
pub mod speech;
pub mod system;
