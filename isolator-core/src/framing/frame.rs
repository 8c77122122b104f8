//! Typed frame passed from the segmenter to the speech gate.

use crate::vad::VadDecision;

/// A contiguous, borrowed slice of mono samples at a known offset and rate.
///
/// Frames never overlap. The last frame of a buffer may be shorter than the
/// nominal frame size.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// Mono f32 samples in [-1.0, 1.0], original precision.
    pub samples: &'a [f32],
    /// Start offset into the source buffer (inclusive, in samples).
    pub offset: usize,
    /// Sample rate in Hz of `samples`.
    pub sample_rate: u32,
    /// Zero-based position in the frame sequence.
    pub index: usize,
    /// Speech verdict; `None` until the gate has classified the frame.
    pub verdict: Option<VadDecision>,
}

impl<'a> Frame<'a> {
    pub fn new(samples: &'a [f32], offset: usize, sample_rate: u32, index: usize) -> Self {
        Self {
            samples,
            offset,
            sample_rate,
            index,
            verdict: None,
        }
    }

    /// Half-open sample range `[offset, offset + len)` covered in the source buffer.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the duration of this frame in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_speech(&self) -> bool {
        self.verdict.is_some_and(VadDecision::is_speech)
    }
}
