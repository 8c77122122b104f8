//! # isolator-core
//!
//! Voice isolation engine: keeps only the frames a voice-activity detector
//! labels as speech and writes them back out as a 16-bit PCM WAV container.
//!
//! ## Architecture
//!
//! ```text
//! SampleBuffer (channel 0) → FrameSegmenter (20 ms frames)
//!                                  │
//!                            SpeechGate ── resample → 16 kHz, i16, 320 samples
//!                                  │            │
//!                                  │      VoiceActivityDetector::process
//!                                  │
//!                       IsolatedBuffer (speech frames copied, rest silent)
//!                                  │
//!                           encode_wav → EncodedContainer
//! ```
//!
//! Each run owns its VAD session and output buffer. Frames are classified
//! strictly in order; the VAD call is the only step that may block.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod encode;
pub mod engine;
pub mod error;
pub mod framing;
pub mod gate;
pub mod ipc;
pub mod vad;

// Convenience re-exports for downstream crates
pub use audio::SampleBuffer;
pub use encode::{encode_wav, EncodedContainer};
pub use engine::pipeline::{IsolatedBuffer, IsolationReport, ProgressSink};
pub use engine::{EngineConfig, IsolationEngine, VadBackend};
pub use error::IsolatorError;
pub use ipc::events::{EngineStatus, EngineStatusEvent, ProgressEvent};
pub use vad::{VadDecision, VoiceActivityDetector};

#[cfg(feature = "webrtc")]
pub use vad::WebRtcVad;
