//! Voice Activity Detection (VAD) capability.
//!
//! The engine treats the detector as a black box with a fixed input
//! contract: 20 ms of 16 kHz audio as exactly 320 signed 16-bit samples.
//! The `VoiceActivityDetector` trait is the `{init, process, dispose}`
//! capability handed to each run; `create` is the `init` step.
//!
//! Detectors may keep state across calls (hangover counters, filter
//! history), so one session serves one file, in frame order.

pub mod energy;

#[cfg(feature = "webrtc")]
pub mod webrtc;

#[cfg(feature = "webrtc")]
pub use webrtc::WebRtcVad;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineConfig, VadBackend};
use crate::error::{IsolatorError, Result};

use energy::EnergyVad;

/// Sample rate the detector consumes (Hz).
pub const VAD_SAMPLE_RATE: u32 = 16_000;

/// Samples per detector frame: 20 ms at 16 kHz.
pub const VAD_FRAME_SAMPLES: usize = 320;

/// One detector-ready frame.
pub type VadFrame = [i16; VAD_FRAME_SAMPLES];

/// Whether a given audio frame contains speech or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VadDecision {
    /// The frame contains speech.
    Speech,
    /// The frame is silent or non-speech.
    Silence,
}

impl VadDecision {
    pub fn is_speech(self) -> bool {
        self == VadDecision::Speech
    }
}

impl From<bool> for VadDecision {
    fn from(is_speech: bool) -> Self {
        if is_speech {
            VadDecision::Speech
        } else {
            VadDecision::Silence
        }
    }
}

/// Trait for all VAD implementations.
///
/// Not `Send`: some backends wrap thread-affine native state. Sessions are
/// created on the thread that runs the pipeline (see
/// `IsolationEngine::isolate_async`).
pub trait VoiceActivityDetector {
    /// Classify one 320-sample, 16 kHz frame.
    ///
    /// # Errors
    /// Returns `IsolatorError::Classification` when the detector cannot
    /// produce a verdict for this frame.
    fn process(&mut self, frame: &VadFrame) -> Result<VadDecision>;

    /// Reset any internal state (e.g. hangover counters).
    fn reset(&mut self);

    /// Release the session. Called once when a run finishes.
    fn dispose(&mut self) {}

    fn name(&self) -> &'static str;
}

impl<V: VoiceActivityDetector + ?Sized> VoiceActivityDetector for Box<V> {
    fn process(&mut self, frame: &VadFrame) -> Result<VadDecision> {
        (**self).process(frame)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn dispose(&mut self) {
        (**self).dispose()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Open a detector session for the backend selected in `config`.
///
/// # Errors
/// Returns `IsolatorError::Configuration` when the backend was not compiled in.
pub fn create(config: &EngineConfig) -> Result<Box<dyn VoiceActivityDetector>> {
    match config.vad_backend {
        VadBackend::Energy => Ok(Box::new(EnergyVad::new(
            config.energy_threshold,
            config.energy_hangover_frames,
        ))),
        #[cfg(feature = "webrtc")]
        VadBackend::WebRtc => Ok(Box::new(WebRtcVad::new(config.webrtc_aggressiveness))),
        #[cfg(not(feature = "webrtc"))]
        VadBackend::WebRtc => Err(IsolatorError::Configuration(
            "compiled without the webrtc feature".into(),
        )),
    }
}
