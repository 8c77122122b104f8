//! WebRTC VAD backend (`webrtc` feature).
//!
//! Wraps the GMM-based detector from the `webrtc-vad` crate configured for
//! 16 kHz input. The native handle is thread-affine, so sessions must be
//! built on the thread that drives the pipeline.

use webrtc_vad::{SampleRate, Vad, VadMode};

use super::{VadDecision, VadFrame, VoiceActivityDetector};
use crate::error::{IsolatorError, Result};

/// Neural-free statistical VAD from the WebRTC project.
pub struct WebRtcVad {
    vad: Vad,
    aggressiveness: u8,
}

impl WebRtcVad {
    /// `aggressiveness` 0 (quality) … 3 (very aggressive); larger values clamp to 3.
    pub fn new(aggressiveness: u8) -> Self {
        let aggressiveness = aggressiveness.min(3);
        Self {
            vad: Self::open(aggressiveness),
            aggressiveness,
        }
    }

    fn open(aggressiveness: u8) -> Vad {
        let mode = match aggressiveness {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            _ => VadMode::VeryAggressive,
        };
        Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, mode)
    }

    pub fn aggressiveness(&self) -> u8 {
        self.aggressiveness
    }
}

impl VoiceActivityDetector for WebRtcVad {
    fn process(&mut self, frame: &VadFrame) -> Result<VadDecision> {
        self.vad
            .is_voice_segment(frame)
            .map(VadDecision::from)
            .map_err(|()| IsolatorError::Classification("webrtc vad rejected frame".into()))
    }

    fn reset(&mut self) {
        self.vad = Self::open(self.aggressiveness);
    }

    fn name(&self) -> &'static str {
        "webrtc_vad"
    }
}
