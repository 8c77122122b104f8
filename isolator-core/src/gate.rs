//! Per-frame speech gate.
//!
//! ## Stages (per frame)
//!
//! ```text
//! 1. Resample original-rate samples → 16 kHz (linear interpolation)
//! 2. Quantize to i16 with sign-asymmetric scaling (−32768 / +32767)
//! 3. < 320 samples → Silence without asking the VAD
//! 4. Truncate to the first 320 samples → VoiceActivityDetector::process
//! 5. VAD error → logged, counted, treated as Silence
//! ```
//!
//! Per-frame failures never leave the gate: one bad frame must not abort
//! the whole file.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::{
    audio::resample::resample,
    framing::Frame,
    vad::{VadDecision, VadFrame, VoiceActivityDetector, VAD_FRAME_SAMPLES, VAD_SAMPLE_RATE},
};

#[derive(Default)]
pub struct GateDiagnostics {
    pub frames_in: AtomicUsize,
    pub short_frames: AtomicUsize,
    pub vad_calls: AtomicUsize,
    pub vad_speech: AtomicUsize,
    pub vad_errors: AtomicUsize,
}

impl GateDiagnostics {
    pub fn reset(&self) {
        self.frames_in.store(0, Ordering::Relaxed);
        self.short_frames.store(0, Ordering::Relaxed);
        self.vad_calls.store(0, Ordering::Relaxed);
        self.vad_speech.store(0, Ordering::Relaxed);
        self.vad_errors.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_in: self.frames_in.load(Ordering::Relaxed),
            short_frames: self.short_frames.load(Ordering::Relaxed),
            vad_calls: self.vad_calls.load(Ordering::Relaxed),
            vad_speech: self.vad_speech.load(Ordering::Relaxed),
            vad_errors: self.vad_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub frames_in: usize,
    pub short_frames: usize,
    pub vad_calls: usize,
    pub vad_speech: usize,
    pub vad_errors: usize,
}

/// Quantize one f32 sample for the VAD: `round(clamp(x) * (x < 0 ? 32768 : 32767))`.
///
/// Not interchangeable with `encode::quantize_for_container`.
pub fn quantize_for_vad(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    let scale = if s < 0.0 { 32_768.0 } else { 32_767.0 };
    (s * scale).round() as i16
}

/// Adapts original-rate frames to the VAD contract and collects verdicts.
#[derive(Clone, Default)]
pub struct SpeechGate {
    diagnostics: Arc<GateDiagnostics>,
}

impl SpeechGate {
    pub fn new(diagnostics: Arc<GateDiagnostics>) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &Arc<GateDiagnostics> {
        &self.diagnostics
    }

    /// Classify `frame`, whose samples are at `original_rate`.
    ///
    /// Returns `false` for frames too short to fill a VAD window and for
    /// frames the VAD failed on.
    pub fn classify<V>(&self, frame: &Frame<'_>, vad: &mut V, original_rate: u32) -> bool
    where
        V: VoiceActivityDetector + ?Sized,
    {
        self.diagnostics.frames_in.fetch_add(1, Ordering::Relaxed);

        let Some(vad_frame) = prepare_vad_frame(frame.samples, original_rate) else {
            self.diagnostics.short_frames.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        self.diagnostics.vad_calls.fetch_add(1, Ordering::Relaxed);
        match vad.process(&vad_frame) {
            Ok(decision) => {
                if decision == VadDecision::Speech {
                    self.diagnostics.vad_speech.fetch_add(1, Ordering::Relaxed);
                }
                decision.is_speech()
            }
            Err(e) => {
                self.diagnostics.vad_errors.fetch_add(1, Ordering::Relaxed);
                warn!(
                    offset = frame.offset,
                    index = frame.index,
                    vad = vad.name(),
                    "vad failed on frame, treating as non-speech: {e}"
                );
                false
            }
        }
    }
}

/// Resample to 16 kHz, quantize, and cut to exactly 320 samples.
///
/// `None` when fewer than 320 samples remain after resampling.
pub fn prepare_vad_frame(samples: &[f32], original_rate: u32) -> Option<VadFrame> {
    let resampled = resample(samples, original_rate, VAD_SAMPLE_RATE);
    if resampled.len() < VAD_FRAME_SAMPLES {
        return None;
    }

    let mut out = [0i16; VAD_FRAME_SAMPLES];
    for (dst, &src) in out.iter_mut().zip(&resampled[..VAD_FRAME_SAMPLES]) {
        *dst = quantize_for_vad(src);
    }
    Some(out)
}
