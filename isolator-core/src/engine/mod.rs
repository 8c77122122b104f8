//! `IsolationEngine`: per-file lifecycle controller.
//!
//! ## Lifecycle
//!
//! ```text
//! IsolationEngine::new()
//!     └─► isolate*()       → status = Processing
//!         ├─► Ok           → status = Completed, EncodedContainer returned
//!         ├─► cancel()     → status = Cancelled, nothing returned
//!         └─► Err          → status = Error, nothing returned
//! ```
//!
//! One engine runs one file at a time (`AlreadyRunning` otherwise). Hosts
//! that process files concurrently create one engine per file; each run owns
//! its VAD session and output buffer.
//!
//! ## Threading
//!
//! Some VAD backends wrap thread-affine native handles and are `!Send`.
//! `isolate_async` therefore takes a VAD *factory* and builds the session
//! inside the `spawn_blocking` closure so it never crosses a thread boundary.

pub mod pipeline;

use std::str::FromStr;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    audio::SampleBuffer,
    encode::EncodedContainer,
    error::{IsolatorError, Result},
    framing::DEFAULT_FRAME_DURATION,
    gate::{DiagnosticsSnapshot, GateDiagnostics, SpeechGate},
    ipc::events::{EngineStatus, EngineStatusEvent, ProgressEvent},
    vad::VoiceActivityDetector,
};

use pipeline::{FrameProgress, IsolationReport};

/// Broadcast channel capacity for progress / status events.
const BROADCAST_CAP: usize = 256;

/// Which VAD implementation `vad::create` opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VadBackend {
    /// RMS threshold detector; always available.
    #[default]
    Energy,
    /// WebRTC GMM detector; requires the `webrtc` feature.
    #[serde(rename = "webrtc")]
    WebRtc,
}

impl FromStr for VadBackend {
    type Err = IsolatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy" | "rms" => Ok(VadBackend::Energy),
            "webrtc" | "web-rtc" | "gmm" => Ok(VadBackend::WebRtc),
            other => Err(IsolatorError::Configuration(format!(
                "unknown vad backend '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for VadBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VadBackend::Energy => "energy",
            VadBackend::WebRtc => "webrtc",
        })
    }
}

/// Configuration for `IsolationEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineConfig {
    /// Detector opened by `vad::create`. Default: `Energy`.
    pub vad_backend: VadBackend,
    /// Energy VAD RMS threshold in [0, 1]. Default: 0.02.
    pub energy_threshold: f32,
    /// Energy VAD internal hangover in frames. Default: 0 (frame-exact).
    pub energy_hangover_frames: u32,
    /// WebRTC aggressiveness 0–3. Default: 2.
    pub webrtc_aggressiveness: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vad_backend: VadBackend::Energy,
            energy_threshold: 0.02,
            energy_hangover_frames: 0,
            webrtc_aggressiveness: 2,
        }
    }
}

impl EngineConfig {
    /// # Errors
    /// Returns `IsolatorError::Configuration` for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !self.energy_threshold.is_finite() || !(0.0..=1.0).contains(&self.energy_threshold) {
            return Err(IsolatorError::Configuration(format!(
                "energy threshold {} outside [0, 1]",
                self.energy_threshold
            )));
        }
        if self.webrtc_aggressiveness > 3 {
            return Err(IsolatorError::Configuration(format!(
                "webrtc aggressiveness {} outside 0–3",
                self.webrtc_aggressiveness
            )));
        }
        Ok(())
    }
}

/// Encoded container plus the run summary.
#[derive(Debug, Clone)]
pub struct IsolationOutput {
    pub container: EncodedContainer,
    pub report: IsolationReport,
}

/// Shared engine state, cloned into the blocking task.
#[derive(Clone)]
struct RunContext {
    config: EngineConfig,
    running: Arc<AtomicBool>,
    cancel_requested: Arc<AtomicBool>,
    status: Arc<Mutex<EngineStatus>>,
    progress_tx: broadcast::Sender<ProgressEvent>,
    status_tx: broadcast::Sender<EngineStatusEvent>,
    next_run_id: Arc<AtomicU64>,
    diagnostics: Arc<GateDiagnostics>,
}

/// Clears the `running` flag when a run ends, however it ends.
struct RunGuard {
    running: Arc<AtomicBool>,
    run_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// The top-level engine handle.
///
/// `IsolationEngine` is `Send + Sync`; wrap it in `Arc` to share it between
/// the task that runs a file and the tasks that observe or cancel it.
pub struct IsolationEngine {
    ctx: RunContext,
}

impl IsolationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (progress_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);

        Self {
            ctx: RunContext {
                config,
                running: Arc::new(AtomicBool::new(false)),
                cancel_requested: Arc::new(AtomicBool::new(false)),
                status: Arc::new(Mutex::new(EngineStatus::Idle)),
                progress_tx,
                status_tx,
                next_run_id: Arc::new(AtomicU64::new(0)),
                diagnostics: Arc::new(GateDiagnostics::default()),
            },
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Isolate speech from `input` with a caller-owned VAD session.
    ///
    /// Blocks the calling thread for the whole run. The session is reset
    /// first but not disposed.
    ///
    /// # Errors
    /// - `IsolatorError::AlreadyRunning` if another run is in progress.
    /// - `IsolatorError::Configuration` for invalid config or input rate.
    /// - `IsolatorError::Cancelled` if `cancel()` was called mid-run.
    /// - `IsolatorError::Encode` if the output cannot be serialised.
    pub fn isolate<V>(&self, input: &SampleBuffer, vad: &mut V) -> Result<IsolationOutput>
    where
        V: VoiceActivityDetector + ?Sized,
    {
        let guard = self.ctx.begin()?;
        let result = self
            .ctx
            .config
            .validate()
            .and_then(|()| self.ctx.execute(&guard, input, vad));
        self.ctx.finish(result)
    }

    /// Isolate speech from `input` with a session opened by `make_vad`.
    ///
    /// The session lives for this run only and is disposed afterwards.
    pub fn isolate_with<F, V>(&self, input: &SampleBuffer, make_vad: F) -> Result<IsolationOutput>
    where
        F: FnOnce(&EngineConfig) -> Result<V>,
        V: VoiceActivityDetector,
    {
        let guard = self.ctx.begin()?;
        self.ctx
            .finish(self.ctx.execute_owned(&guard, input, make_vad))
    }

    /// Async variant of `isolate_with`.
    ///
    /// The run happens on Tokio's blocking pool; `make_vad` is called on that
    /// thread, so `V` does not need to be `Send`.
    pub async fn isolate_async<F, V>(
        &self,
        input: SampleBuffer,
        make_vad: F,
    ) -> Result<IsolationOutput>
    where
        F: FnOnce(&EngineConfig) -> Result<V> + Send + 'static,
        V: VoiceActivityDetector + 'static,
    {
        let guard = self.ctx.begin()?;
        let ctx = self.ctx.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let result = ctx.execute_owned(&guard, &input, make_vad);
            ctx.finish(result)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(e) => {
                let err = IsolatorError::Other(anyhow::anyhow!("isolation task died: {e}"));
                self.ctx.set_status(EngineStatus::Error, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Ask the current run to stop before its next frame.
    ///
    /// No-op when idle.
    pub fn cancel(&self) {
        if self.ctx.running.load(Ordering::SeqCst) {
            self.ctx.cancel_requested.store(true, Ordering::SeqCst);
            info!("isolation cancel requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ctx.running.load(Ordering::SeqCst)
    }

    /// Current engine status (snapshot).
    pub fn status(&self) -> EngineStatus {
        *self.ctx.status.lock()
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.ctx.progress_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<EngineStatusEvent> {
        self.ctx.status_tx.subscribe()
    }

    /// Gate counters for the current or most recent run.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.ctx.diagnostics.snapshot()
    }
}

impl RunContext {
    fn begin(&self) -> Result<RunGuard> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IsolatorError::AlreadyRunning);
        }
        let guard = RunGuard {
            running: Arc::clone(&self.running),
            run_id: self.next_run_id.fetch_add(1, Ordering::SeqCst),
        };
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.diagnostics.reset();
        self.set_status(EngineStatus::Processing, None);
        Ok(guard)
    }

    fn execute_owned<F, V>(
        &self,
        guard: &RunGuard,
        input: &SampleBuffer,
        make_vad: F,
    ) -> Result<IsolationOutput>
    where
        F: FnOnce(&EngineConfig) -> Result<V>,
        V: VoiceActivityDetector,
    {
        self.config.validate()?;
        let mut vad = make_vad(&self.config)?;
        info!(run_id = guard.run_id, vad = vad.name(), "vad session opened");
        let result = self.execute(guard, input, &mut vad);
        vad.dispose();
        result
    }

    fn execute<V>(
        &self,
        guard: &RunGuard,
        input: &SampleBuffer,
        vad: &mut V,
    ) -> Result<IsolationOutput>
    where
        V: VoiceActivityDetector + ?Sized,
    {
        let run_id = guard.run_id;
        let gate = SpeechGate::new(Arc::clone(&self.diagnostics));

        let mut sink = |p: &FrameProgress| {
            let _ = self.progress_tx.send(ProgressEvent {
                run_id,
                frame_index: p.frame_index,
                total_frames: p.total_frames,
                progress: p.progress,
                percent: (p.progress * 100.0).round().clamp(0.0, 100.0) as u8,
                is_speech: p.is_speech,
            });
            !self.cancel_requested.load(Ordering::SeqCst)
        };

        let (isolated, report) =
            pipeline::run(input, DEFAULT_FRAME_DURATION, &gate, vad, &mut sink)?;
        let container = isolated.encode()?;

        info!(
            run_id,
            bytes = container.len(),
            speech_frames = report.speech_frames,
            total_frames = report.total_frames,
            "isolated audio encoded"
        );

        Ok(IsolationOutput { container, report })
    }

    /// Publish the terminal status for `result` and pass it through.
    fn finish(&self, result: Result<IsolationOutput>) -> Result<IsolationOutput> {
        match &result {
            Ok(out) => self.set_status(
                EngineStatus::Completed,
                Some(format!(
                    "{} of {} frames kept as speech",
                    out.report.speech_frames, out.report.total_frames
                )),
            ),
            Err(IsolatorError::Cancelled) => self.set_status(EngineStatus::Cancelled, None),
            Err(e) => {
                error!("isolation failed: {e}");
                self.set_status(EngineStatus::Error, Some(e.to_string()));
            }
        }
        result
    }

    fn set_status(&self, new_status: EngineStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(EngineStatusEvent {
            status: new_status,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::vad::{VadDecision, VadFrame};

    struct ConstVad {
        decision: VadDecision,
        disposed: Arc<AtomicBool>,
    }

    impl ConstVad {
        fn new(decision: VadDecision) -> Self {
            Self {
                decision,
                disposed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl VoiceActivityDetector for ConstVad {
        fn process(&mut self, _frame: &VadFrame) -> Result<VadDecision> {
            Ok(self.decision)
        }

        fn reset(&mut self) {}

        fn dispose(&mut self) {
            self.disposed.store(true, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "const"
        }
    }

    fn speech_input() -> SampleBuffer {
        SampleBuffer::mono(vec![0.3; 16_000], 16_000).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_threshold_fails_before_processing() {
        let engine = IsolationEngine::new(EngineConfig {
            energy_threshold: 2.0,
            ..EngineConfig::default()
        });
        let mut vad = ConstVad::new(VadDecision::Speech);
        let err = engine.isolate(&speech_input(), &mut vad);
        assert!(matches!(err, Err(IsolatorError::Configuration(_))));
        assert_eq!(engine.status(), EngineStatus::Error);
        assert!(!engine.is_running());
    }

    #[test]
    fn vad_backend_parses_aliases() {
        assert_eq!("Energy".parse::<VadBackend>().unwrap(), VadBackend::Energy);
        assert_eq!(" webrtc ".parse::<VadBackend>().unwrap(), VadBackend::WebRtc);
        assert!("silero".parse::<VadBackend>().is_err());
        assert_eq!(VadBackend::WebRtc.to_string(), "webrtc");
    }

    #[test]
    fn config_deserializes_with_defaults_for_missing_fields() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"vadBackend":"webrtc","energyThreshold":0.05}"#).unwrap();
        assert_eq!(cfg.vad_backend, VadBackend::WebRtc);
        assert!((cfg.energy_threshold - 0.05).abs() < f32::EPSILON);
        assert_eq!(cfg.energy_hangover_frames, 0);
        assert_eq!(cfg.webrtc_aggressiveness, 2);
    }

    #[test]
    fn completed_run_reports_status_and_progress() {
        let engine = IsolationEngine::new(EngineConfig::default());
        let mut status_rx = engine.subscribe_status();
        let mut progress_rx = engine.subscribe_progress();
        let mut vad = ConstVad::new(VadDecision::Speech);

        let out = engine.isolate(&speech_input(), &mut vad).unwrap();
        assert_eq!(out.report.total_frames, 50);
        assert_eq!(out.report.speech_frames, 50);
        assert_eq!(out.container.len(), 44 + 32_000);
        assert_eq!(engine.status(), EngineStatus::Completed);
        assert!(!vad.disposed.load(Ordering::SeqCst), "borrowed vad is not disposed");

        assert_eq!(
            status_rx.try_recv().unwrap().status,
            EngineStatus::Processing
        );
        assert_eq!(status_rx.try_recv().unwrap().status, EngineStatus::Completed);

        let mut last = None;
        while let Ok(ev) = progress_rx.try_recv() {
            last = Some(ev);
        }
        let last = last.expect("progress events");
        assert_eq!(last.percent, 100);
        assert_eq!(last.frame_index, 49);
        assert_eq!(last.run_id, 0);
    }

    #[test]
    fn isolate_with_disposes_owned_session() {
        let engine = IsolationEngine::new(EngineConfig::default());
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&disposed);

        engine
            .isolate_with(&speech_input(), move |_cfg| {
                Ok(ConstVad {
                    decision: VadDecision::Silence,
                    disposed: flag,
                })
            })
            .unwrap();

        assert!(disposed.load(Ordering::SeqCst));
    }

    #[test]
    fn factory_failure_yields_error_status() {
        let engine = IsolationEngine::new(EngineConfig::default());
        let result = engine.isolate_with(&speech_input(), |_cfg| -> Result<ConstVad> {
            Err(IsolatorError::Configuration("model missing".into()))
        });
        assert!(matches!(result, Err(IsolatorError::Configuration(_))));
        assert_eq!(engine.status(), EngineStatus::Error);
        assert!(!engine.is_running());
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let engine = IsolationEngine::new(EngineConfig::default());
        engine.cancel();
        let mut vad = ConstVad::new(VadDecision::Silence);
        assert!(engine.isolate(&speech_input(), &mut vad).is_ok());
    }

    #[test]
    fn run_ids_increase_per_run() {
        let engine = IsolationEngine::new(EngineConfig::default());
        let mut rx = engine.subscribe_progress();
        let input = SampleBuffer::mono(vec![0.1; 320], 16_000).unwrap();
        let mut vad = ConstVad::new(VadDecision::Silence);

        engine.isolate(&input, &mut vad).unwrap();
        engine.isolate(&input, &mut vad).unwrap();

        assert_eq!(rx.try_recv().unwrap().run_id, 0);
        assert_eq!(rx.try_recv().unwrap().run_id, 1);
    }
}
