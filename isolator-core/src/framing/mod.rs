//! Fixed-duration, non-overlapping frame segmentation.
//!
//! `FrameSegmenter` walks a mono buffer lazily, yielding one `Frame` per
//! `frame_size` samples plus a shorter trailing frame when the buffer length
//! is not a multiple of the frame size. Progress is tracked as
//! `frames_yielded / total_frames`.

pub mod frame;

use std::time::Duration;

pub use frame::Frame;

use crate::error::{IsolatorError, Result};

/// Nominal frame duration used by the engine (20 ms).
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(20);

/// Frame size in samples: `floor(sample_rate * duration)`.
///
/// Computed in integer microseconds so common rates (44.1 kHz, 22.05 kHz)
/// land on exact sizes.
///
/// # Errors
/// Returns `IsolatorError::Configuration` when the result is zero samples.
pub fn frame_size_for(sample_rate: u32, duration: Duration) -> Result<usize> {
    let size = u128::from(sample_rate) * duration.as_micros() / 1_000_000;
    if size == 0 {
        return Err(IsolatorError::Configuration(format!(
            "{} Hz × {:?} yields no samples per frame",
            sample_rate, duration
        )));
    }
    usize::try_from(size).map_err(|_| {
        IsolatorError::Configuration(format!("frame size {size} does not fit in memory"))
    })
}

/// Lazy iterator over the frames of one buffer.
///
/// Cloning a segmenter (or calling `restart`) replays the sequence from the
/// first frame.
#[derive(Debug, Clone)]
pub struct FrameSegmenter<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    frame_size: usize,
    total_frames: usize,
    next_index: usize,
}

impl<'a> FrameSegmenter<'a> {
    /// Create a segmenter over `samples`.
    ///
    /// # Errors
    /// Returns `IsolatorError::Configuration` if `sample_rate` and
    /// `frame_duration` give fewer than one sample per frame.
    pub fn new(samples: &'a [f32], sample_rate: u32, frame_duration: Duration) -> Result<Self> {
        let frame_size = frame_size_for(sample_rate, frame_duration)?;
        Ok(Self {
            samples,
            sample_rate,
            frame_size,
            total_frames: samples.len().div_ceil(frame_size),
            next_index: 0,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// `ceil(len / frame_size)`.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Number of frames yielded so far.
    pub fn frames_yielded(&self) -> usize {
        self.next_index
    }

    /// Fraction of frames yielded in [0.0, 1.0].
    ///
    /// Exactly 1.0 once the last frame has been yielded (and for an empty
    /// buffer, which has nothing to yield).
    pub fn progress(&self) -> f32 {
        if self.total_frames == 0 {
            return 1.0;
        }
        self.next_index as f32 / self.total_frames as f32
    }

    pub fn is_complete(&self) -> bool {
        self.next_index >= self.total_frames
    }

    /// Rewind to the first frame.
    pub fn restart(&mut self) {
        self.next_index = 0;
    }
}

impl<'a> Iterator for FrameSegmenter<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_complete() {
            return None;
        }
        let index = self.next_index;
        let start = index * self.frame_size;
        let end = (start + self.frame_size).min(self.samples.len());
        self.next_index += 1;
        Some(Frame::new(
            &self.samples[start..end],
            start,
            self.sample_rate,
            index,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_frames - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSegmenter<'_> {}
