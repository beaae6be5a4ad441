//! Energy based phrase endpointing.
//!
//! The threshold is calibrated from a stretch of ambient noise. Listening
//! then waits for the first frame louder than the threshold, and the phrase
//! ends after enough consecutive quiet audio or when it hits the phrase limit.

use std::time::Duration;

use crate::config::AudioConfig;

/// Length of one analysis frame.
pub const FRAME: Duration = Duration::from_millis(30);

/// Result of feeding one frame.
#[derive(Debug, PartialEq)]
pub enum Endpoint {
    /// Keep feeding frames
    Pending,
    /// No speech started before the listen timeout
    TimedOut,
    /// A complete phrase
    Phrase(Vec<f32>),
}

pub struct Endpointer {
    threshold: f32,
    frame_len: usize,
    timeout: usize,
    phrase_limit: usize,
    pause: usize,
    waited: usize,
    silent: usize,
    speaking: bool,
    phrase: Vec<f32>,
}

fn samples_in(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

/// Root mean square of the frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f32 = frame.iter().map(|s| s * s).sum();
    (sum / frame.len() as f32).sqrt()
}

impl Endpointer {
    /// Creates an endpointer whose threshold is calibrated on `ambient`.
    pub fn new(config: &AudioConfig, sample_rate: u32, ambient: &[f32]) -> Self {
        let threshold = (rms(ambient) * config.energy_ratio).max(config.min_energy);
        Self {
            threshold,
            frame_len: samples_in(FRAME, sample_rate).max(1),
            timeout: samples_in(config.timeout(), sample_rate),
            phrase_limit: samples_in(config.phrase_time_limit(), sample_rate),
            pause: samples_in(config.pause_threshold(), sample_rate),
            waited: 0,
            silent: 0,
            speaking: false,
            phrase: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Number of samples expected per call to [`Endpointer::push`].
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn push(&mut self, frame: &[f32]) -> Endpoint {
        let loud = rms(frame) > self.threshold;
        if !self.speaking {
            if !loud {
                self.waited += frame.len();
                if self.waited >= self.timeout {
                    return Endpoint::TimedOut;
                }
                return Endpoint::Pending;
            }
            self.speaking = true;
        }

        self.phrase.extend_from_slice(frame);
        if loud {
            self.silent = 0;
        } else {
            self.silent += frame.len();
        }

        if self.silent >= self.pause || self.phrase.len() >= self.phrase_limit {
            self.speaking = false;
            self.silent = 0;
            return Endpoint::Phrase(std::mem::take(&mut self.phrase));
        }
        Endpoint::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn config() -> AudioConfig {
        AudioConfig {
            timeout_secs: 1.0,
            phrase_time_limit_secs: 2.0,
            pause_threshold_secs: 0.3,
            ..AudioConfig::default()
        }
    }

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    /// Feeds `audio` frame by frame and returns the first non pending result.
    fn run(endpointer: &mut Endpointer, audio: &[f32]) -> Endpoint {
        for frame in audio.chunks(endpointer.frame_len()) {
            match endpointer.push(frame) {
                Endpoint::Pending => continue,
                done => return done,
            }
        }
        Endpoint::Pending
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&tone(100, 0.5)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_calibration() {
        let quiet = Endpointer::new(&config(), RATE, &tone(100, 0.001));
        assert_eq!(quiet.threshold(), config().min_energy);

        let noisy = Endpointer::new(&config(), RATE, &tone(100, 0.1));
        assert!((noisy.threshold() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_silence_times_out() {
        let mut endpointer = Endpointer::new(&config(), RATE, &[]);
        assert_eq!(endpointer.frame_len(), 30);
        assert_eq!(run(&mut endpointer, &tone(900, 0.0)), Endpoint::Pending);
        assert_eq!(run(&mut endpointer, &tone(300, 0.0)), Endpoint::TimedOut);
    }

    #[test]
    fn test_phrase_ends_on_pause() {
        let mut endpointer = Endpointer::new(&config(), RATE, &[]);
        let mut audio = tone(300, 0.0);
        audio.extend(tone(600, 0.5));
        audio.extend(tone(600, 0.0));

        let Endpoint::Phrase(phrase) = run(&mut endpointer, &audio) else {
            panic!("expected a phrase");
        };
        // Speech plus the trailing pause, without the leading silence.
        assert_eq!(phrase.len(), 600 + 300);
        assert!(phrase[..600].iter().all(|s| s.abs() == 0.5));
    }

    #[test]
    fn test_waiting_for_speech_does_not_limit_phrase() {
        let mut endpointer = Endpointer::new(&config(), RATE, &[]);
        // Speech starting just before the timeout is still captured.
        let mut audio = tone(960, 0.0);
        audio.extend(tone(300, 0.5));
        audio.extend(tone(300, 0.0));
        assert!(matches!(run(&mut endpointer, &audio), Endpoint::Phrase(_)));
    }

    #[test]
    fn test_phrase_time_limit() {
        let mut endpointer = Endpointer::new(&config(), RATE, &[]);
        let Endpoint::Phrase(phrase) = run(&mut endpointer, &tone(5000, 0.5)) else {
            panic!("expected a phrase");
        };
        assert_eq!(phrase.len(), 2010);
    }
}
