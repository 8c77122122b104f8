//! Event types published to observers of the engine.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so a host can
//! forward them to a UI, a log sink, or a job-status endpoint unchanged.

pub mod events;
