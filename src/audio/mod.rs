//! Microphone capture.
//!
//! This module opens the configured input device, keeps a paused stream
//! around, and on each [`Microphone::listen`] call records one phrase: the
//! ambient noise is sampled first, then audio is endpointed until a pause,
//! the phrase limit, or the listen timeout.

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample, SupportedStreamConfig};
use hound::{WavSpec, WavWriter};
use log::{debug, error, info, warn};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{AudioConfig, Config};

mod endpoint;
mod resample;

pub use endpoint::{Endpoint, Endpointer, rms};
pub use resample::{audio_resample, downmix};

/// Sample rate expected by the recognizer.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// How long we tolerate an input stream that delivers nothing.
const STALL_LIMIT: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Records single phrases from an input device.
pub struct Microphone {
    stream: cpal::Stream,
    samples: HeapCons<f32>,
    sample_rate: u32,
    config: AudioConfig,
    recording_path: Option<PathBuf>,
}

impl Microphone {
    /// Opens the configured (or default) input device.
    ///
    /// The stream is created paused; it only runs while [`Microphone::listen`] is active.
    pub fn new(config: &Config) -> Result<Self> {
        let host = cpal::default_host();
        debug!("Available hosts: {:?}", cpal::available_hosts());
        debug!("Default host: {:?}", host.id());

        let devices = host.input_devices()?;
        let names: HashSet<_> = devices.into_iter().flat_map(|d| d.name()).collect();
        debug!("Available input devices: {names:?}");

        let mut devices = host.input_devices()?;
        let device = if let Some(device_name) = &config.audio.device {
            devices
                .find(|d| d.name().map(|name| name == *device_name).unwrap_or(false))
                .ok_or_else(|| {
                    anyhow!(
                        "Requested audio device '{}' not found, available: {:?}",
                        device_name,
                        names
                    )
                })?
        } else {
            host.default_input_device()
                .ok_or_else(|| anyhow!("No default input device found"))?
        };

        info!("Using input device: {}", device.name()?);

        let stream_config = Self::pick_stream_config(&device)?;
        debug!("Using stream config: {:?}", stream_config);

        let sample_rate = stream_config.sample_rate().0;
        let channels = usize::from(stream_config.channels());
        // A few seconds of slack; the consumer drains continuously while listening.
        let (producer, samples) = HeapRb::<f32>::new(sample_rate as usize * 4).split();

        let stream = match stream_config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, channels, producer)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, channels, producer)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, channels, producer)?
            }
            cpal::SampleFormat::I32 => {
                build_stream::<i32>(&device, &stream_config, channels, producer)?
            }
            format => bail!("Unsupported sample format '{format}'"),
        };
        stream.pause().context("Cannot pause")?;

        Ok(Self {
            stream,
            samples,
            sample_rate,
            config: config.audio.clone(),
            recording_path: config.paths.recording_path.clone(),
        })
    }

    /// Prefers a native 16kHz mono stream, falls back to the device default.
    fn pick_stream_config(device: &cpal::Device) -> Result<SupportedStreamConfig> {
        let wanted = cpal::SampleRate(WHISPER_SAMPLE_RATE);
        if let Ok(supported_configs) = device.supported_input_configs() {
            for range in supported_configs {
                if range.channels() == 1
                    && range.min_sample_rate() <= wanted
                    && range.max_sample_rate() >= wanted
                    && range.sample_format() == cpal::SampleFormat::F32
                {
                    return Ok(range.with_sample_rate(wanted));
                }
            }
        }
        debug!("Could not find a 16kHz mono config, using device default");
        device
            .default_input_config()
            .context("Reading default input config")
    }

    /// Records one phrase, resampled to 16kHz mono.
    ///
    /// Returns `Ok(None)` when nobody started speaking before the listen timeout.
    pub fn listen(&mut self) -> Result<Option<Vec<f32>>> {
        self.samples.clear();
        self.stream.play().context("Starting input stream")?;
        let recorded = self.record();
        if let Err(err) = self.stream.pause() {
            warn!("Cannot pause input stream: {err}");
        }

        let Some(phrase) = recorded? else {
            return Ok(None);
        };
        debug!(
            "Captured {:.2}s of speech",
            phrase.len() as f32 / self.sample_rate as f32
        );
        let phrase = audio_resample(&phrase, self.sample_rate, WHISPER_SAMPLE_RATE);

        if let Some(path) = &self.recording_path {
            if let Err(err) = write_wav(path, &phrase) {
                warn!("Cannot write recording to {}: {err:#}", path.display());
            }
        }
        Ok(Some(phrase))
    }

    fn record(&mut self) -> Result<Option<Vec<f32>>> {
        let calibration = (self.config.calibration().as_secs_f32() * self.sample_rate as f32) as usize;
        let ambient = self.read_exact(calibration)?;
        let mut endpointer = Endpointer::new(&self.config, self.sample_rate, &ambient);
        debug!("Energy threshold: {:.4}", endpointer.threshold());

        let mut frame = vec![0.0; endpointer.frame_len()];
        loop {
            self.fill(&mut frame)?;
            match endpointer.push(&frame) {
                Endpoint::Pending => continue,
                Endpoint::TimedOut => return Ok(None),
                Endpoint::Phrase(phrase) => return Ok(Some(phrase)),
            }
        }
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<f32>> {
        let mut buffer = vec![0.0; len];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    /// Blocks until `buffer` is full of fresh samples.
    fn fill(&mut self, buffer: &mut [f32]) -> Result<()> {
        let mut filled = 0;
        let mut idle = Duration::ZERO;
        while filled < buffer.len() {
            let read = self.samples.pop_slice(&mut buffer[filled..]);
            if read == 0 {
                if idle >= STALL_LIMIT {
                    bail!("Input stream delivered no audio for {STALL_LIMIT:?}");
                }
                std::thread::sleep(POLL_INTERVAL);
                idle += POLL_INTERVAL;
            } else {
                filled += read;
                idle = Duration::ZERO;
            }
        }
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &SupportedStreamConfig,
    channels: usize,
    mut producer: HeapProd<f32>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut mono = Vec::new();
    let err_fn = move |err| {
        error!("Audio stream error: {}", err);
    };
    let stream = device
        .build_input_stream(
            &config.config(),
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|s| f32::from_sample(*s)).collect();
                mono.clear();
                mono.extend(downmix(&samples, channels));
                let pushed = producer.push_slice(&mono);
                if pushed < mono.len() {
                    debug!("Buffer full, dropped {} samples", mono.len() - pushed);
                }
            },
            err_fn,
            None,
        )
        .context("Failed to create audio stream")?;
    Ok(stream)
}

fn write_wav(path: &Path, samples: &[f32]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let spec = WavSpec {
        channels: 1,
        sample_rate: WHISPER_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).context("Wav writer failed")?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
