//! Text-to-speech through the platform's speech program.
//!
//! macOS has `say`, most Linux desktops ship `espeak-ng`, `espeak` or
//! `spd-say`, and Windows can reach SAPI through PowerShell. The program is
//! resolved once at startup; failing to find one is fatal for the assistant.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::config::VoiceConfig;
use crate::error::{Error, Result};

/// Something that says text out loud, blocking until playback completes.
pub trait Speaker {
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Reads text from stdin so it never has to be quoted on the command line.
const SAPI_SCRIPT: &str = "Add-Type -AssemblyName System.Speech; \
    $voice = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
    $voice.Speak([Console]::In.ReadToEnd())";

/// Command line flavour of a speech program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Say,
    Espeak,
    SpdSay,
    Sapi,
}

impl Engine {
    /// Recognizes a speech program by its file name.
    pub fn from_program(program: &str) -> Option<Self> {
        let stem = Path::new(program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(program)
            .to_lowercase();
        match stem.as_str() {
            "say" => Some(Self::Say),
            "espeak" | "espeak-ng" => Some(Self::Espeak),
            "spd-say" => Some(Self::SpdSay),
            "powershell" | "pwsh" => Some(Self::Sapi),
            _ => None,
        }
    }

    /// Arguments for speaking `text`. For [`Engine::Sapi`] the text goes to stdin instead.
    ///
    /// The text always follows `--`, so answers starting with a dash are spoken, not parsed.
    pub fn args(self, text: &str, rate: Option<u32>) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            Self::Say => {
                if let Some(rate) = rate {
                    args.extend(["-r".to_string(), rate.to_string()]);
                }
                args.extend(["--".to_string(), text.to_string()]);
            }
            Self::Espeak => {
                if let Some(rate) = rate {
                    args.extend(["-s".to_string(), rate.to_string()]);
                }
                args.extend(["--".to_string(), text.to_string()]);
            }
            Self::SpdSay => {
                // -w waits for the message to be spoken
                args.extend(["-w".to_string(), "--".to_string(), text.to_string()]);
            }
            Self::Sapi => {
                args.extend(
                    ["-NoProfile", "-NonInteractive", "-Command", SAPI_SCRIPT].map(String::from),
                );
            }
        }
        args
    }
}

fn platform_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["powershell", "pwsh"]
    } else if cfg!(target_os = "macos") {
        &["say"]
    } else {
        &["espeak-ng", "espeak", "spd-say"]
    }
}

/// Speaks through an external speech program.
#[derive(Debug)]
pub struct SystemVoice {
    program: PathBuf,
    engine: Engine,
    rate: Option<u32>,
}

impl SystemVoice {
    /// Resolves the configured engine, or the first one available on this platform.
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        if let Some(name) = &config.engine {
            let engine = Engine::from_program(name)
                .ok_or_else(|| Error::Config(format!("Unknown speech engine '{name}'")))?;
            let program = which::which(name)
                .map_err(|e| Error::Speech(format!("Speech engine '{name}' not found: {e}")))?;
            return Ok(Self::with_program(program, engine, config.rate));
        }

        for name in platform_candidates() {
            if let (Ok(program), Some(engine)) = (which::which(name), Engine::from_program(name)) {
                return Ok(Self::with_program(program, engine, config.rate));
            }
        }
        Err(Error::Speech(format!(
            "No speech program found, tried {:?}",
            platform_candidates()
        )))
    }

    pub fn with_program(program: PathBuf, engine: Engine, rate: Option<u32>) -> Self {
        debug!("Speaking through {} ({engine:?})", program.display());
        Self {
            program,
            engine,
            rate,
        }
    }
}

impl Speaker for SystemVoice {
    fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let mut command = Command::new(&self.program);
        command
            .args(self.engine.args(text, self.rate))
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = if self.engine == Engine::Sapi {
            let mut child = command.stdin(Stdio::piped()).spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes())?;
            }
            child.wait_with_output()?
        } else {
            command.stdin(Stdio::null()).output()?
        };

        if !output.status.success() {
            return Err(Error::Speech(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_program() {
        assert_eq!(Engine::from_program("say"), Some(Engine::Say));
        assert_eq!(Engine::from_program("/usr/bin/espeak-ng"), Some(Engine::Espeak));
        assert_eq!(Engine::from_program("spd-say"), Some(Engine::SpdSay));
        assert_eq!(Engine::from_program("PowerShell.exe"), Some(Engine::Sapi));
        assert_eq!(Engine::from_program("festival"), None);
    }

    #[test]
    fn test_engine_args() {
        assert_eq!(Engine::Say.args("hi", None), vec!["--", "hi"]);
        assert_eq!(Engine::Say.args("hi", Some(200)), vec!["-r", "200", "--", "hi"]);
        assert_eq!(Engine::Espeak.args("hi", Some(160)), vec!["-s", "160", "--", "hi"]);
        assert_eq!(Engine::SpdSay.args("hi", Some(160)), vec!["-w", "--", "hi"]);
        // SAPI reads the text from stdin.
        let args = Engine::Sapi.args("hi", None);
        assert!(!args.contains(&"hi".to_string()));
        assert_eq!(args[2], "-Command");
    }

    #[test]
    fn test_text_starting_with_dash_is_not_an_option() {
        for engine in [Engine::Say, Engine::Espeak, Engine::SpdSay] {
            for text in ["- Use a HashMap.", "-o answer.aiff", "-w out.wav hello"] {
                let args = engine.args(text, Some(180));
                assert_eq!(args.last().map(String::as_str), Some(text), "{engine:?}");
                assert_eq!(args[args.len() - 2], "--", "{engine:?}");
                assert_eq!(args.iter().filter(|a| a.as_str() == text).count(), 1);
            }
        }
    }

    #[test]
    fn test_unknown_engine_is_config_error() {
        let config = VoiceConfig {
            engine: Some("festival".to_string()),
            ..VoiceConfig::default()
        };
        assert!(matches!(SystemVoice::new(&config), Err(Error::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_program_reports_error() {
        let mut voice = SystemVoice::with_program(PathBuf::from("false"), Engine::Say, None);
        assert!(matches!(voice.speak("hello"), Err(Error::Speech(_))));
        // Nothing to say is not an error and never runs the program.
        assert!(voice.speak("   ").is_ok());
    }
}
