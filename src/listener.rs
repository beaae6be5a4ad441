//! Voice capture: one call, one utterance or one sentinel outcome.

use log::{error, warn};

use crate::asr::Asr;
use crate::audio::Microphone;

/// Outcome of acquiring one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// Lowercased recognized (or typed) text
    Heard(String),
    /// Audio was captured but contained no recognizable speech
    NoSpeech,
    /// Nobody started speaking before the listen timeout
    Timeout,
    /// The microphone or the recognizer failed
    ServiceError,
}

impl Capture {
    /// Normalizes raw text into an utterance.
    pub fn heard(text: &str) -> Self {
        Capture::Heard(text.trim().to_lowercase())
    }
}

/// Something that listens for one spoken utterance.
pub trait Listener {
    fn capture(&mut self) -> Capture;
}

/// Microphone plus local Whisper recognition.
pub struct VoiceListener {
    microphone: Microphone,
    asr: Asr,
}

impl VoiceListener {
    pub fn new(microphone: Microphone, asr: Asr) -> Self {
        Self { microphone, asr }
    }
}

impl Listener for VoiceListener {
    fn capture(&mut self) -> Capture {
        println!("\nListening...");
        let samples = match self.microphone.listen() {
            Ok(Some(samples)) => samples,
            Ok(None) => return Capture::Timeout,
            Err(err) => {
                error!("Could not capture audio: {err:#}");
                return Capture::ServiceError;
            }
        };

        println!("Recognizing...");
        match self.asr.run(&samples) {
            Ok(text) if text.is_empty() => Capture::NoSpeech,
            Ok(text) => {
                println!("User said: {text}");
                Capture::heard(&text)
            }
            Err(err) => {
                error!("Could not recognize speech: {err:#}");
                Capture::ServiceError
            }
        }
    }
}

/// Stand-in used when no microphone or model could be set up.
#[derive(Debug, Default)]
pub struct Unavailable;

impl Listener for Unavailable {
    fn capture(&mut self) -> Capture {
        warn!("Voice input is unavailable, type 'text' to enter a command");
        Capture::ServiceError
    }
}
