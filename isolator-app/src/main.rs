//! `isolator` command-line host.
//!
//! Decodes a WAV file, runs it through `IsolationEngine`, and writes the
//! speech-only result next to the input (or to `--output`).

mod decode;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use isolator_core::{vad, IsolationEngine, ProgressEvent};
use settings::{default_settings_path, load_settings, save_settings, AppSettings};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "isolator_core=info,isolator_app=info";

#[derive(Parser, Debug)]
#[command(name = "isolator")]
#[command(about = "Keep the spoken parts of a recording, silence the rest", long_about = None)]
struct Cli {
    /// Input WAV file
    input: PathBuf,

    /// Output WAV file (default: <input stem>.<suffix>.wav beside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (default: platform data directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// VAD backend: energy | webrtc
    #[arg(long)]
    vad: Option<String>,

    /// Energy VAD RMS threshold in [0, 1]
    #[arg(long)]
    threshold: Option<f32>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    fn apply_to(&self, settings: &mut AppSettings) {
        if let Some(vad) = &self.vad {
            settings.vad_backend = vad.clone();
        }
        if let Some(threshold) = self.threshold {
            settings.energy_threshold = threshold;
        }
        settings.normalize();
    }
}

/// Logs progress every `step` percent until the engine's channel closes.
///
/// Returns the last percentage received.
async fn log_progress(mut rx: broadcast::Receiver<ProgressEvent>, step: u8) -> Option<u8> {
    let mut next = step;
    let mut last = None;
    loop {
        match rx.recv().await {
            Ok(ev) => {
                if ev.percent >= next || ev.percent == 100 {
                    info!(
                        percent = ev.percent,
                        frame = ev.frame_index,
                        total = ev.total_frames,
                        "progress"
                    );
                    next = ev.percent.saturating_add(step);
                }
                last = Some(ev.percent);
            }
            Err(RecvError::Lagged(n)) => {
                warn!("progress receiver lagged by {n} events");
            }
            Err(RecvError::Closed) => break,
        }
    }
    last
}

fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    input.with_file_name(format!("{stem}.{suffix}.wav"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let mut app_settings = load_settings(&settings_path);
    app_settings.apply_env_overrides();
    cli.apply_to(&mut app_settings);
    info!(
        settings_path = ?settings_path,
        vad_backend = %app_settings.vad_backend,
        energy_threshold = app_settings.energy_threshold,
        webrtc_aggressiveness = app_settings.webrtc_aggressiveness,
        "runtime settings loaded"
    );
    if cli.save_settings {
        save_settings(&settings_path, &app_settings)
            .with_context(|| format!("writing {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings saved");
    }

    let input = decode::read_wav_file(&cli.input)?;
    info!(
        path = %cli.input.display(),
        sample_rate = input.sample_rate(),
        channels = input.channel_count(),
        duration_secs = input.duration_secs(),
        "input decoded"
    );
    if input.channel_count() > 1 {
        warn!(
            channels = input.channel_count(),
            "multi-channel input: analysing and keeping channel 0 only"
        );
    }

    let engine = IsolationEngine::new(app_settings.to_engine_config());

    let progress_task = tokio::spawn(log_progress(
        engine.subscribe_progress(),
        app_settings.progress_step_percent,
    ));

    let result = engine.isolate_async(input, vad::create).await;
    // Closing the progress channel lets the logger drain and exit.
    drop(engine);
    progress_task.await.context("progress logger panicked")?;
    let output = result.context("isolation failed")?;

    let out_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, &app_settings.output_suffix));
    tokio::fs::write(&out_path, output.container.as_bytes())
        .await
        .with_context(|| format!("writing {}", out_path.display()))?;

    let report = &output.report;
    info!(
        path = %out_path.display(),
        bytes = output.container.len(),
        total_frames = report.total_frames,
        speech_frames = report.speech_frames,
        speech_ratio = report.speech_ratio(),
        short_frames = report.short_frames,
        vad_errors = report.vad_errors,
        "isolated audio written"
    );
    if report.short_frames > 0 && report.short_frames == report.total_frames {
        warn!(
            sample_rate = report.sample_rate,
            "every frame was too short to classify at this sample rate; output is silent"
        );
    }
    info!(report = %serde_json::to_string(report)?, "run summary");

    Ok(())
}
