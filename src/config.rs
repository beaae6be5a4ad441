//! Configuration management for the Phoenix assistant.
//!
//! This module provides functionality for loading and managing application
//! configuration: microphone listening parameters, the speech recognition
//! model, the language model service, launchable applications and the
//! process janitor policy.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};

/// Processes the aggressive clean never terminates.
pub const DEFAULT_WHITELIST: [&str; 11] = [
    "explorer.exe",
    "taskmgr.exe",
    "cmd.exe",
    "conhost.exe",
    "dwm.exe",
    "svchost.exe",
    "csrss.exe",
    "wininit.exe",
    "winlogon.exe",
    "python.exe",
    "pythonw.exe",
];

/// Applications closed by the regular optimization.
pub const DEFAULT_OPTIMIZE_TARGETS: [&str; 4] =
    ["chrome.exe", "msedge.exe", "firefox.exe", "discord.exe"];

/// Microphone and listening configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct AudioConfig {
    /// Audio input device name (e.g., "sysdefault:CARD=C920")
    /// If not specified, the default device will be used
    pub device: Option<String>,
    /// Maximum wait for the start of a phrase
    pub timeout_secs: f32,
    /// Maximum duration of a single phrase
    pub phrase_time_limit_secs: f32,
    /// Silence that ends a phrase
    pub pause_threshold_secs: f32,
    /// Ambient noise sampled before listening
    pub calibration_secs: f32,
    /// Speech must be this many times louder than the ambient noise
    pub energy_ratio: f32,
    /// Lower bound for the speech energy threshold (RMS of f32 samples)
    pub min_energy: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            timeout_secs: 5.0,
            phrase_time_limit_secs: 10.0,
            pause_threshold_secs: 1.0,
            calibration_secs: 1.0,
            energy_ratio: 1.5,
            min_energy: 0.01,
        }
    }
}

impl AudioConfig {
    /// Rejects durations that cannot be represented, such as negative or NaN seconds.
    pub fn validate(&self) -> Result<()> {
        for (field, secs) in [
            ("timeout_secs", self.timeout_secs),
            ("phrase_time_limit_secs", self.phrase_time_limit_secs),
            ("pause_threshold_secs", self.pause_threshold_secs),
            ("calibration_secs", self.calibration_secs),
        ] {
            Duration::try_from_secs_f32(secs)
                .with_context(|| format!("Invalid [audio] {field} = {secs}"))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f32(self.timeout_secs)
    }

    pub fn phrase_time_limit(&self) -> Duration {
        Duration::from_secs_f32(self.phrase_time_limit_secs)
    }

    pub fn pause_threshold(&self) -> Duration {
        Duration::from_secs_f32(self.pause_threshold_secs)
    }

    pub fn calibration(&self) -> Duration {
        Duration::from_secs_f32(self.calibration_secs)
    }
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct PathConfig {
    /// Cache directory for storing temporary files
    pub cache_dir: PathBuf,
    /// When set, the last captured phrase is written there as a WAV file
    pub recording_path: Option<PathBuf>,
}

impl Default for PathConfig {
    fn default() -> Self {
        let mut cache_dir = dirs::cache_dir()
            .context("Cannot find cache directory")
            .unwrap_or_else(|_| PathBuf::from("~/.cache"));
        cache_dir.push("phoenix");
        Self {
            cache_dir,
            recording_path: None,
        }
    }
}

/// Whisper model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct ModelConfig {
    /// Model repository on Hugging Face
    pub repo: String,
    /// Model filename
    pub filename: String,
    /// Spoken language passed to the model
    pub language: String,
    /// Initial prompt biasing the vocabulary
    pub initial_prompt: Option<String>,
    /// Map of text to replace with their replacements
    pub replacements: HashMap<String, String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            repo: "ggerganov/whisper.cpp".to_string(),
            filename: "ggml-base.en.bin".to_string(),
            language: "en".to_string(),
            initial_prompt: None,
            replacements: HashMap::new(),
        }
    }
}

/// Hosted language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct LlmConfig {
    /// Model name used in the generateContent call
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Base URL of the API
    pub endpoint: String,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct VoiceConfig {
    /// Name the assistant introduces itself with
    pub name: String,
    /// TTS program to use ("say", "espeak-ng", "espeak", "spd-say", "powershell").
    /// If not specified, the first one available on this platform is used
    pub engine: Option<String>,
    /// Speaking rate in words per minute, for engines that support it
    pub rate: Option<u32>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: "Phoenix".to_string(),
            engine: None,
            rate: None,
        }
    }
}

/// What an application launcher starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AppTarget {
    /// Spawn a program
    Program {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Open a URL in the default browser
    Url { url: String },
}

/// An application the assistant can open by voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppLauncher {
    /// Spoken name ("Opening {name}.")
    pub name: String,
    /// Phrases that trigger this launcher
    pub phrases: Vec<String>,
    pub target: AppTarget,
}

fn default_apps() -> Vec<AppLauncher> {
    vec![
        AppLauncher {
            name: "Notepad".to_string(),
            phrases: vec!["open notepad".to_string()],
            target: AppTarget::Program {
                command: "notepad".to_string(),
                args: vec![],
            },
        },
        AppLauncher {
            name: "YouTube".to_string(),
            phrases: vec!["open youtube".to_string()],
            target: AppTarget::Url {
                url: "https://youtube.com".to_string(),
            },
        },
    ]
}

/// Process and temporary file cleanup policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
#[serde(default)]
pub struct JanitorConfig {
    /// Process names never terminated by the aggressive clean
    pub whitelist: Vec<String>,
    /// Process names closed by the regular optimization
    pub optimize_targets: Vec<String>,
    /// Directories whose files are deleted by the optimization.
    /// If empty, the platform temporary directories are used
    pub temp_dirs: Vec<PathBuf>,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
            optimize_targets: DEFAULT_OPTIMIZE_TARGETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temp_dirs: vec![],
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Config {
    /// Microphone settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Path configuration
    #[serde(default)]
    pub paths: PathConfig,
    /// Speech recognition model configuration
    #[serde(default)]
    pub model: ModelConfig,
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Speech synthesis configuration
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Process janitor policy
    #[serde(default)]
    pub janitor: JanitorConfig,
    /// Applications that can be opened by voice
    #[serde(default = "default_apps")]
    pub apps: Vec<AppLauncher>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            paths: PathConfig::default(),
            model: ModelConfig::default(),
            llm: LlmConfig::default(),
            voice: VoiceConfig::default(),
            janitor: JanitorConfig::default(),
            apps: default_apps(),
        }
    }
}

impl Config {
    /// Gets the default configuration file path.
    fn default_config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .context("Cannot find config directory")
            .unwrap_or_else(|_| PathBuf::from("~/.config"));
        let mut path = config_dir;
        path.push("phoenix");
        path.push("config.toml");
        path
    }

    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.audio.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Loads configuration from the default location, creating it if it doesn't exist.
    pub fn load_or_write_default(path: Option<&Path>) -> Result<Self> {
        let default_path = Self::default_config_path();
        let path = path.unwrap_or(&default_path);
        if path.exists() {
            return Self::from_file(path)
                .context(format!("Reading default config from {}", path.display()));
        }

        let config = Self::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.save_to_file(path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.timeout(), Duration::from_secs(5));
        assert_eq!(config.audio.phrase_time_limit(), Duration::from_secs(10));
        assert_eq!(config.audio.pause_threshold(), Duration::from_secs(1));
        assert_eq!(config.model.repo, "ggerganov/whisper.cpp");
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.voice.name, "Phoenix");
        assert_eq!(config.janitor.whitelist.len(), 11);
        assert!(config.janitor.whitelist.contains(&"python.exe".to_string()));
        assert!(config.janitor.temp_dirs.is_empty());
        assert_eq!(config.apps.len(), 2);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [audio]
            device = "sysdefault:CARD=C920"
            timeout_secs = 3.0

            [model]
            filename = "ggml-small.en.bin"
            replacements = { "phoenicks" = "phoenix" }

            [voice]
            engine = "espeak-ng"
            rate = 180

            [janitor]
            whitelist = ["Explorer.exe"]
            temp_dirs = ["/tmp/phoenix-test"]

            [[apps]]
            name = "Terminal"
            phrases = ["open terminal", "open the terminal"]
            target = { type = "program", command = "alacritty" }

            [[apps]]
            name = "Docs"
            phrases = ["open the docs"]
            target = { type = "url", url = "https://docs.rs" }
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.audio.device.as_deref(), Some("sysdefault:CARD=C920"));
        assert_eq!(config.audio.timeout(), Duration::from_secs(3));
        // Unspecified fields keep their defaults.
        assert_eq!(config.audio.phrase_time_limit(), Duration::from_secs(10));
        assert_eq!(config.model.repo, "ggerganov/whisper.cpp");
        assert_eq!(config.model.filename, "ggml-small.en.bin");
        assert_eq!(
            config.model.replacements.get("phoenicks"),
            Some(&"phoenix".to_string())
        );
        assert_eq!(config.voice.engine.as_deref(), Some("espeak-ng"));
        assert_eq!(config.voice.rate, Some(180));
        assert_eq!(config.janitor.whitelist, vec!["Explorer.exe".to_string()]);
        assert_eq!(config.janitor.optimize_targets.len(), 4);
        assert_eq!(
            config.janitor.temp_dirs,
            vec![PathBuf::from("/tmp/phoenix-test")]
        );
        assert_eq!(config.apps.len(), 2);
        assert!(matches!(
            &config.apps[0].target,
            AppTarget::Program { command, args } if command == "alacritty" && args.is_empty()
        ));
        assert!(matches!(
            &config.apps[1].target,
            AppTarget::Url { url } if url == "https://docs.rs"
        ));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.apps, default_apps());
        assert_eq!(config.janitor, JanitorConfig::default());
        assert_eq!(config.llm, LlmConfig::default());
    }

    #[test]
    fn test_unknown_target_type() {
        let toml = r#"
            [[apps]]
            name = "Mail"
            phrases = ["open mail"]
            target = { type = "shortcut", path = "mail.lnk" }
        "#;

        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config() {
        let toml = r#"
            [audio]
            timeout_secs = "soon"
        "#;

        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_durations_are_rejected_on_load() {
        let temp_dir = tempdir().unwrap();
        for (i, value) in ["timeout_secs = -1.0", "pause_threshold_secs = nan", "calibration_secs = 1e30"]
            .iter()
            .enumerate()
        {
            let path = temp_dir.path().join(format!("config{i}.toml"));
            std::fs::write(&path, format!("[audio]\n{value}\n")).unwrap();
            let err = Config::from_file(&path).unwrap_err();
            assert!(err.to_string().starts_with("Invalid [audio]"), "{value}: {err:#}");
        }

        assert!(AudioConfig::default().validate().is_ok());
        let zero = AudioConfig {
            timeout_secs: 0.0,
            ..AudioConfig::default()
        };
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn test_load_or_write_default_validates_existing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[audio]\nphrase_time_limit_secs = -5.0\n").unwrap();
        assert!(Config::load_or_write_default(Some(&path)).is_err());
    }

    #[test]
    fn test_example_default_config_round_trip() {
        let default = Config::default();
        let serialized = toml::to_string(&default).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(default, deserialized);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.audio.device = Some("USB Mic".to_string());
        config.voice.name = "Athena".to_string();
        config.janitor.optimize_targets = vec!["slack.exe".to_string()];
        config.paths.recording_path = Some(PathBuf::from("/tmp/test/last.wav"));

        config.save_to_file(&config_path).unwrap();
        let loaded = Config::from_file(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_creation() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("phoenix").join("config.toml");

        let config = Config::load_or_write_default(Some(&config_path)).unwrap();

        assert!(config_path.exists());
        assert_eq!(config.voice.name, "Phoenix");
        assert_eq!(config.model.filename, "ggml-base.en.bin");

        // Second load reads the file that was just written.
        let reloaded = Config::load_or_write_default(Some(&config_path)).unwrap();
        assert_eq!(reloaded, config);
    }
}
