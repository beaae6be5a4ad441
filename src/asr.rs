//! Whisper model integration for speech recognition.
//!
//! This module provides functionality for downloading and running the Whisper model
//! for speech-to-text transcription. The model is loaded on first use and kept
//! for the lifetime of the process.

use anyhow::{Context, Result};
use hf_hub::api::tokio::ApiBuilder;
use log::{debug, info};
use std::path::{Path, PathBuf};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::ModelConfig;

/// Downloads the Whisper model from Hugging Face Hub.
///
/// This function fetches the model from the specified repository and filename.
pub async fn download_model(config: &ModelConfig) -> Result<PathBuf> {
    let api = ApiBuilder::from_env().build()?;
    let repo = api.model(config.repo.clone());
    let filename = repo.get(&config.filename).await?;
    Ok(filename)
}

pub struct Asr {
    model_path: PathBuf,
    config: ModelConfig,
    context: Option<WhisperContext>,
}

impl Asr {
    pub fn new(model_path: &Path, config: &ModelConfig) -> Self {
        Self {
            model_path: model_path.to_path_buf(),
            config: config.clone(),
            context: None,
        }
    }

    pub fn load(&mut self) -> Result<()> {
        debug!("Trying to load model {}", self.model_path.display());
        let context = WhisperContext::new_with_params(
            &self.model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .context(format!("Loading model at {}", self.model_path.display()))?;
        self.context = Some(context);
        info!("Context loaded");
        Ok(())
    }

    /// Transcribes 16kHz mono samples.
    pub fn run(&mut self, samples: &[f32]) -> Result<String> {
        if self.context.is_none() {
            self.load()?;
        }
        let Some(context) = &self.context else {
            anyhow::bail!("Context was not loaded");
        };
        let mut state = context.create_state().context("Creating state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(Some(self.config.language.as_str()));
        if let Some(prompt) = &self.config.initial_prompt {
            params.set_initial_prompt(prompt);
        }

        state.full(params, samples).context("Running model")?;

        let num_segments = state.full_n_segments()?;
        let mut segments = Vec::new();
        for i in 0..num_segments {
            segments.push(state.full_get_segment_text(i)?);
        }
        Ok(clean_transcript(&segments, &self.config))
    }
}

/// Joins segments, drops non-speech markers such as `[BLANK_AUDIO]` or
/// `(wind blowing)` and applies the configured replacements.
pub fn clean_transcript(segments: &[String], config: &ModelConfig) -> String {
    let mut text = segments
        .iter()
        .map(|s| s.trim())
        .filter(|s| !is_annotation(s))
        .collect::<Vec<_>>()
        .join(" ");

    for (from, to) in &config.replacements {
        text = text.replace(from, to);
    }
    text.trim().to_string()
}

fn is_annotation(segment: &str) -> bool {
    segment.is_empty()
        || (segment.starts_with('[') && segment.ends_with(']'))
        || (segment.starts_with('(') && segment.ends_with(')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_transcript_joins_segments() {
        let config = ModelConfig::default();
        let text = clean_transcript(&segments(&[" What's the", " date?"]), &config);
        assert_eq!(text, "What's the date?");
    }

    #[test]
    fn test_blank_audio_is_empty() {
        let config = ModelConfig::default();
        assert_eq!(
            clean_transcript(&segments(&[" [BLANK_AUDIO]", "(wind blowing)"]), &config),
            ""
        );
    }

    #[test]
    fn test_replacements() {
        let mut config = ModelConfig::default();
        config
            .replacements
            .insert("deep cleen".to_string(), "deep clean".to_string());
        assert_eq!(
            clean_transcript(&segments(&["please deep cleen"]), &config),
            "please deep clean"
        );
    }
}
