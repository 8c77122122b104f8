//! Decoded audio buffers handed to the engine.
//!
//! # Channel handling
//!
//! Voice activity is analysed on a single channel. Multi-channel input is
//! reduced to channel 0 (no down-mix), and the isolated output is always mono.
//!
//! Decoding a file into a `SampleBuffer` is the host's job; the core accepts
//! any well-formed buffer regardless of how it was produced.

pub mod resample;

use crate::error::{IsolatorError, Result};

/// Per-channel f32 sample storage at a fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from one sample vector per channel.
    ///
    /// # Errors
    /// Returns `IsolatorError::Configuration` when there are no channels,
    /// the channels differ in length, or `sample_rate` is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(IsolatorError::Configuration(
                "sample rate must be positive".into(),
            ));
        }
        let Some(first) = channels.first() else {
            return Err(IsolatorError::Configuration(
                "sample buffer has no channels".into(),
            ));
        };
        let len = first.len();
        if let Some((idx, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(IsolatorError::Configuration(format!(
                "channel {idx} has {} samples, expected {len}",
                ch.len()
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Single-channel buffer.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Split interleaved frames (`L R L R …`) into per-channel vectors.
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(data: &[f32], channel_count: u16, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(IsolatorError::Configuration(
                "channel count must be positive".into(),
            ));
        }
        let ch = usize::from(channel_count);
        let frames = data.len() / ch;
        let mut channels = vec![Vec::with_capacity(frames); ch];
        for frame in data.chunks_exact(ch) {
            for (c, sample) in frame.iter().enumerate() {
                channels[c].push(*sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// The channel used for analysis and reconstruction (channel 0).
    pub fn primary_channel(&self) -> &[f32] {
        &self.channels[0]
    }

    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the duration of this buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }
}
