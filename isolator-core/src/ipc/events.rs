//! Events broadcast by `IsolationEngine`.
//!
//! | Event | Subscription |
//! |-------|--------------|
//! | `ProgressEvent` | `IsolationEngine::subscribe_progress` |
//! | `EngineStatusEvent` | `IsolationEngine::subscribe_status` |

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Emitted after every classified frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Identifies the run; increases by one per `isolate*` call.
    pub run_id: u64,
    /// Zero-based index of the frame just classified.
    pub frame_index: usize,
    pub total_frames: usize,
    /// Fraction of frames done in [0.0, 1.0].
    pub progress: f32,
    /// `progress` as a rounded percentage (0–100).
    pub percent: u8,
    /// Gate verdict for the frame.
    pub is_speech: bool,
}

// ---------------------------------------------------------------------------
// Engine status events
// ---------------------------------------------------------------------------

/// Emitted when the engine state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message, run summary).
    pub detail: Option<String>,
}

/// Current state of the isolation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// No run in progress and none has finished yet.
    Idle,
    /// A file is being segmented and classified.
    Processing,
    /// The last run produced an encoded container.
    Completed,
    /// The last run was abandoned by the host.
    Cancelled,
    /// The last run failed; no output was produced.
    Error,
}

impl EngineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EngineStatus::Completed | EngineStatus::Cancelled | EngineStatus::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_event_serializes_with_camel_case_fields() {
        let event = ProgressEvent {
            run_id: 4,
            frame_index: 9,
            total_frames: 50,
            progress: 0.2,
            percent: 20,
            is_speech: true,
        };

        let json = serde_json::to_value(&event).expect("serialize progress event");
        assert_eq!(json["runId"], 4);
        assert_eq!(json["frameIndex"], 9);
        assert_eq!(json["totalFrames"], 50);
        assert_eq!(json["percent"], 20);
        assert_eq!(json["isSpeech"], true);
        let progress = json["progress"]
            .as_f64()
            .expect("progress should serialize as number");
        assert!((progress - 0.2).abs() < 1e-5);

        let round_trip: ProgressEvent =
            serde_json::from_value(json).expect("deserialize progress event");
        assert_eq!(round_trip.frame_index, 9);
        assert!(round_trip.is_speech);
    }

    #[test]
    fn engine_status_event_serializes_with_lowercase_status() {
        let event = EngineStatusEvent {
            status: EngineStatus::Processing,
            detail: Some("input.wav".into()),
        };

        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "processing");
        assert_eq!(json["detail"], "input.wav");

        let round_trip: EngineStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, EngineStatus::Processing);
        assert_eq!(round_trip.detail.as_deref(), Some("input.wav"));
    }

    #[test]
    fn engine_status_rejects_non_lowercase_values() {
        let err = serde_json::from_str::<EngineStatus>(r#""Completed""#);
        assert!(err.is_err(), "expected invalid casing to fail");
    }

    #[test]
    fn terminal_states() {
        assert!(!EngineStatus::Idle.is_terminal());
        assert!(!EngineStatus::Processing.is_terminal());
        assert!(EngineStatus::Completed.is_terminal());
        assert!(EngineStatus::Cancelled.is_terminal());
        assert!(EngineStatus::Error.is_terminal());
    }
}
