//! Process and temporary file cleanup.
//!
//! The aggressive clean terminates every process that is not whitelisted,
//! working from a single snapshot of the process table. The regular
//! optimization closes a fixed list of applications and empties the
//! temporary directories. Both are best effort: individual failures are
//! logged and skipped, never retried.

use std::collections::HashSet;

use log::{debug, info};

use crate::config::JanitorConfig;
use crate::error::Result;
use crate::listener::Capture;
use crate::system::{FileSystem, ProcessController};

/// Process names exempt from termination, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    names: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Adds a name to the whitelist.
    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_lowercase());
    }

    /// Adds this executable, so the assistant never terminates itself.
    pub fn protect_current_process(mut self) -> Self {
        let own_name = std::env::current_exe()
            .ok()
            .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()));
        match own_name {
            Some(name) => {
                debug!("Whitelisting own executable {name}");
                self.insert(&name);
            }
            None => debug!("Cannot determine own executable name"),
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether a confirmation reply allows a destructive operation.
///
/// Only recognized text containing "yes" confirms; every sentinel declines.
pub fn confirms(reply: &Capture) -> bool {
    matches!(reply, Capture::Heard(text) if text.contains("yes"))
}

pub struct Janitor {
    whitelist: Whitelist,
    optimize_targets: Vec<String>,
}

impl Janitor {
    pub fn new(whitelist: Whitelist, optimize_targets: Vec<String>) -> Self {
        Self {
            whitelist,
            optimize_targets,
        }
    }

    /// Janitor for the configured policy, with the running executable protected.
    pub fn from_config(config: &JanitorConfig) -> Self {
        Self::new(
            Whitelist::new(&config.whitelist).protect_current_process(),
            config.optimize_targets.clone(),
        )
    }

    /// Entries of the snapshot that the aggressive clean terminates, in snapshot order.
    pub fn targets<'a>(&'a self, snapshot: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        snapshot
            .iter()
            .map(String::as_str)
            .filter(|name| !self.whitelist.contains(name))
    }

    /// Terminates every non whitelisted process.
    ///
    /// Returns the number of termination attempts. Fails only if the process
    /// list cannot be obtained, in which case nothing is terminated.
    pub fn terminate_unlisted(&self, processes: &mut dyn ProcessController) -> Result<usize> {
        let snapshot = processes.list_processes()?;
        let mut attempts = 0;
        for name in self.targets(&snapshot) {
            info!("Terminating {name}");
            if let Err(err) = processes.kill(name) {
                debug!("Could not terminate {name}: {err}");
            }
            attempts += 1;
        }
        Ok(attempts)
    }

    /// Closes the well-known background applications, ignoring failures.
    pub fn close_background_apps(&self, processes: &mut dyn ProcessController) {
        for name in &self.optimize_targets {
            if let Err(err) = processes.kill(name) {
                debug!("Could not close {name}: {err}");
            }
        }
    }

    /// Deletes the files in the temporary directories and returns how many were removed.
    pub fn clean_temp_files(&self, files: &dyn FileSystem) -> usize {
        let mut deleted = 0;
        for path in files.list_temp_files() {
            match files.delete(&path) {
                Ok(()) => deleted += 1,
                Err(err) => debug!("Could not delete {}: {err}", path.display()),
            }
        }
        info!("Deleted {deleted} temporary files");
        deleted
    }
}
