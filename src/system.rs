//! OS capabilities used by the command handlers.
//!
//! Handlers only see the [`ProcessController`], [`FileSystem`] and
//! [`Launcher`] traits. The implementations here shell out to the platform
//! utilities (`tasklist`/`taskkill`, the desktop URL opener) or touch the
//! temporary directories directly.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::config::{AppTarget, JanitorConfig};
use crate::error::{Error, Result};

/// Lists and terminates processes by image name.
pub trait ProcessController {
    /// Point-in-time snapshot of running process names.
    ///
    /// Returns [`Error::Unsupported`] when this platform has no listing facility.
    fn list_processes(&mut self) -> Result<Vec<String>>;

    /// Forcibly terminates every process with this name.
    fn kill(&mut self, name: &str) -> Result<()>;
}

/// Temporary file access.
pub trait FileSystem {
    /// Files (not subdirectories) directly inside the temporary directories.
    fn list_temp_files(&self) -> Vec<PathBuf>;

    fn delete(&self, path: &Path) -> Result<()>;
}

/// Opens applications and URLs.
pub trait Launcher {
    fn launch(&mut self, target: &AppTarget) -> Result<()>;
}

/// Windows task list utilities.
#[derive(Debug, Default)]
pub struct TaskList;

/// Extracts image names from `tasklist /FO CSV /NH` output.
pub fn parse_tasklist_csv(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('"')?;
            let (name, _) = rest.split_once('"')?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

impl ProcessController for TaskList {
    fn list_processes(&mut self) -> Result<Vec<String>> {
        if !cfg!(target_os = "windows") {
            return Err(Error::Unsupported("tasklist is only available on Windows".to_string()));
        }
        let output = Command::new("tasklist")
            .args(["/FO", "CSV", "/NH"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::Unsupported("tasklist command not found".to_string()),
                _ => Error::ProcessListing(e.to_string()),
            })?;
        if !output.status.success() {
            return Err(Error::ProcessListing(format!(
                "tasklist exited with {}",
                output.status
            )));
        }
        let names = parse_tasklist_csv(&String::from_utf8_lossy(&output.stdout));
        debug!("tasklist reported {} processes", names.len());
        Ok(names)
    }

    fn kill(&mut self, name: &str) -> Result<()> {
        let status = Command::new("taskkill")
            .args(["/F", "/IM", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(Error::Unknown(format!("taskkill {name} exited with {status}")));
        }
        Ok(())
    }
}

/// Temporary directories on this platform.
pub fn default_temp_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut dirs = Vec::new();
        if let Some(temp) = std::env::var_os("TEMP") {
            dirs.push(PathBuf::from(temp));
        }
        let root = std::env::var_os("SystemRoot")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
        dirs.push(root.join("Temp"));
        dirs
    } else {
        vec![std::env::temp_dir()]
    }
}

/// The temporary directories the optimization empties.
#[derive(Debug, Clone)]
pub struct TempDirs {
    dirs: Vec<PathBuf>,
}

impl TempDirs {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        Self { dirs: unique }
    }

    /// Configured directories, or the platform ones when none are configured.
    pub fn from_config(config: &JanitorConfig) -> Self {
        if config.temp_dirs.is_empty() {
            Self::new(default_temp_dirs())
        } else {
            Self::new(config.temp_dirs.clone())
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl FileSystem for TempDirs {
    fn list_temp_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in &self.dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Cannot read {}: {err}", dir.display());
                    continue;
                }
            };
            files.extend(
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| path.is_file()),
            );
        }
        files
    }

    fn delete(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }
}

/// Launches programs and opens URLs with the desktop's default handler.
#[derive(Debug, Default)]
pub struct Desktop;

fn url_opener(url: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        // The empty string is the window title `start` expects first.
        command.args(["/C", "start", "", url]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    }
}

impl Launcher for Desktop {
    fn launch(&mut self, target: &AppTarget) -> Result<()> {
        let mut command = match target {
            AppTarget::Program { command, args } => {
                let mut program = Command::new(command);
                program.args(args);
                program
            }
            AppTarget::Url { url } => url_opener(url),
        };
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Launch(format!("{target:?}: {e}")))?;
        info!("Launched {target:?} as pid {}", child.id());
        Ok(())
    }
}
