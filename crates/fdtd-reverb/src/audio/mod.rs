//! Audio side of the reverb.
//!
//! Provides:
//! - The multichannel block processor
//! - WAV file I/O

pub mod processor;

pub use processor::FdtdReverb;

use crate::error::{Result, ReverbError};
use std::path::Path;
use tracing::{debug, info};

/// Decoded WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    /// One buffer per channel
    pub channels: Vec<Vec<f32>>,
    /// Sample rate (Hz)
    pub sample_rate: u32,
}

impl WavAudio {
    /// Number of frames.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when no frames were decoded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load a WAV file, deinterleaved and normalized to [-1, 1].
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<WavAudio> {
    let path = path.as_ref();
    info!("Opening audio file: {}", path.display());
    let reader = hound::WavReader::open(path)?;

    let spec = reader.spec();
    let channel_count = usize::from(spec.channels);
    if channel_count == 0 {
        return Err(ReverbError::wav("file declares zero channels"));
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (channel, sample) in channels.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }

    debug!(
        "Decoded {} frames, {} channels, {} Hz",
        channels[0].len(),
        channel_count,
        spec.sample_rate
    );

    Ok(WavAudio {
        channels,
        sample_rate: spec.sample_rate,
    })
}

/// Save deinterleaved channels as a 32-bit float WAV file.
///
/// Channels are truncated to the shortest one.
pub fn save_wav<P: AsRef<Path>>(path: P, channels: &[Vec<f32>], sample_rate: u32) -> Result<()> {
    let channel_count = u16::try_from(channels.len())
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| ReverbError::wav(format!("cannot write {} channels", channels.len())))?;

    let spec = hound::WavSpec {
        channels: channel_count,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for n in 0..frames {
        for channel in channels {
            writer.write_sample(channel[n])?;
        }
    }
    writer.finalize()?;

    info!(
        "Wrote {} frames to {}",
        frames,
        path.as_ref().display()
    );
    Ok(())
}

/// Scale a buffer so its peak magnitude equals `peak`. Silent buffers are
/// left untouched.
pub fn normalize(samples: &mut [f32], peak: f32) {
    let max = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    if max > 0.0 {
        let gain = peak / max;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
}
