//! Error types for the Phoenix assistant.
//!
//! This module defines the error type returned by the collaborators the
//! command loop talks to (speech, language model, OS process and file
//! control). Startup glue keeps using `anyhow` and converts at the seams.

use thiserror::Error;

/// Custom error type for the Phoenix assistant.
///
/// Every failure ends up as spoken or printed text, so variants only carry a
/// human readable message. The one distinction the command loop acts on is
/// [`Error::Unsupported`], which the janitor reports as a platform notice.
#[derive(Error, Debug)]
pub enum Error {
    /// Error related to speech synthesis
    #[error("Speech synthesis error: {0}")]
    Speech(String),

    /// Error returned by the language model service
    #[error("Language model error: {0}")]
    Llm(String),

    /// Listing running processes failed
    #[error("Process listing error: {0}")]
    ProcessListing(String),

    /// The OS facility needed for an operation does not exist on this platform
    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    /// Launching an application or URL failed
    #[error("Launch error: {0}")]
    Launch(String),

    /// Error related to file system operations
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Error related to application configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catch-all for unexpected errors
    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Unknown(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::FileSystem(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Llm(err.to_string())
    }
}
