//! Energy-based VAD using RMS threshold + hangover counter.
//!
//! ## Algorithm
//!
//! 1. Normalise the i16 frame to [-1.0, 1.0) and compute its RMS.
//! 2. If RMS ≥ `threshold` → emit `Speech`, reload hangover counter.
//! 3. If RMS < `threshold` and hangover counter > 0 → emit `Speech`,
//!    decrement counter.
//! 4. Otherwise → emit `Silence`.
//!
//! With `hangover_frames = 0` (the engine default) every frame is judged on
//! its own energy alone.

use super::{VadDecision, VadFrame, VoiceActivityDetector};
use crate::error::Result;

/// A simple energy-based voice activity detector.
#[derive(Debug, Clone)]
pub struct EnergyVad {
    /// RMS amplitude threshold. Frames above this are considered speech.
    /// Typical range: 0.01–0.05.
    threshold: f32,
    /// How many consecutive below-threshold frames to still emit `Speech`
    /// after real speech ends.
    hangover_frames: u32,
    /// Current hangover countdown.
    hangover_counter: u32,
}

impl EnergyVad {
    /// Create a new `EnergyVad`.
    ///
    /// # Parameters
    /// - `threshold`: RMS level above which a frame is considered speech.
    ///   Default: `0.02`.
    /// - `hangover_frames`: Number of silent frames to extend speech detection.
    ///   Default: `0`.
    pub fn new(threshold: f32, hangover_frames: u32) -> Self {
        Self {
            threshold,
            hangover_frames,
            hangover_counter: 0,
        }
    }

    /// Compute the root-mean-square of an i16 frame, normalised to full scale.
    fn rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples
            .iter()
            .map(|&s| {
                let v = f64::from(s) / 32_768.0;
                v * v
            })
            .sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }
}

impl Default for EnergyVad {
    fn default() -> Self {
        Self::new(0.02, 0)
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn process(&mut self, frame: &VadFrame) -> Result<VadDecision> {
        let rms = Self::rms(frame);

        let decision = if rms >= self.threshold {
            self.hangover_counter = self.hangover_frames;
            VadDecision::Speech
        } else if self.hangover_counter > 0 {
            self.hangover_counter -= 1;
            VadDecision::Speech
        } else {
            VadDecision::Silence
        };
        Ok(decision)
    }

    fn reset(&mut self) {
        self.hangover_counter = 0;
    }

    fn name(&self) -> &'static str {
        "energy_vad"
    }
}
