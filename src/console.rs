//! Interactive prompt used to choose between voice and typed input.

use std::io::{self, BufRead, Write};

/// A line-oriented prompt.
pub trait Console {
    /// Shows `prompt` and reads one line without its line ending.
    /// Returns `None` once the input is closed, and an `InvalidData` error
    /// for a line that is not UTF-8 (the line is still consumed).
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Console backed by the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
