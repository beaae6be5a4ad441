//! Mapping utterances to commands.
//!
//! Each command is recognized by substring phrases. Groups are tested in a
//! fixed priority order and the first group with a matching phrase wins, so
//! "aggressive clean and then quit" is an aggressive clean.

use crate::config::AppLauncher;

const AGGRESSIVE_CLEAN: &[&str] = &["aggressive clean", "deep clean"];
const OPTIMIZE: &[&str] = &["optimize my laptop"];
const TIME: &[&str] = &["the time"];
const DATE: &[&str] = &["the date"];
const PROGRAMMING: &[&str] = &["explain", "code for", "what is"];
const EXIT: &[&str] = &["exit", "stop", "quit"];

/// A recognized request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<'a> {
    AggressiveClean,
    Optimize,
    Open(&'a AppLauncher),
    Time,
    Date,
    ProgrammingQuestion,
    Exit,
}

fn contains_any<S: AsRef<str>>(utterance: &str, phrases: &[S]) -> bool {
    phrases
        .iter()
        .any(|phrase| utterance.contains(phrase.as_ref()))
}

/// The commands available in this session.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    apps: Vec<AppLauncher>,
}

impl CommandSet {
    pub fn new(mut apps: Vec<AppLauncher>) -> Self {
        // Utterances are lowercased, so phrases must be too.
        for app in &mut apps {
            for phrase in &mut app.phrases {
                *phrase = phrase.to_lowercase();
            }
        }
        Self { apps }
    }

    /// Classifies a lowercased utterance. Unmatched utterances yield `None`.
    pub fn classify(&self, utterance: &str) -> Option<Command<'_>> {
        if contains_any(utterance, AGGRESSIVE_CLEAN) {
            return Some(Command::AggressiveClean);
        }
        if contains_any(utterance, OPTIMIZE) {
            return Some(Command::Optimize);
        }
        if let Some(app) = self
            .apps
            .iter()
            .find(|app| contains_any(utterance, app.phrases.as_slice()))
        {
            return Some(Command::Open(app));
        }
        if contains_any(utterance, TIME) {
            return Some(Command::Time);
        }
        if contains_any(utterance, DATE) {
            return Some(Command::Date);
        }
        if contains_any(utterance, PROGRAMMING) {
            return Some(Command::ProgrammingQuestion);
        }
        if contains_any(utterance, EXIT) {
            return Some(Command::Exit);
        }
        None
    }
}
