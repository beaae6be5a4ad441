use log::error;
use samplerate::{ConverterType, convert};

/// Converts mono `data` from `rate_in` to `rate_out`.
///
/// Returns an empty buffer when the converter rejects the input.
pub fn audio_resample(data: &[f32], rate_in: u32, rate_out: u32) -> Vec<f32> {
    if rate_in == rate_out {
        return data.to_vec();
    }
    convert(rate_in, rate_out, 1, ConverterType::SincBestQuality, data).unwrap_or_else(|err| {
        error!("Resampling {rate_in}Hz to {rate_out}Hz failed: {err}");
        Vec::new()
    })
}

/// Averages interleaved channels down to mono.
pub fn downmix(data: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(move |frame| frame.iter().sum::<f32>() / channels as f32)
}
