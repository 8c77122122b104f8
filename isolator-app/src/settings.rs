//! Persistent host settings (JSON file in the user data directory).

use std::fs;
use std::path::{Path, PathBuf};

use isolator_core::{EngineConfig, VadBackend};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_VAD: &str = "ISOLATOR_VAD";
pub const ENV_VAD_THRESHOLD: &str = "ISOLATOR_VAD_THRESHOLD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub vad_backend: String,
    pub energy_threshold: f32,
    pub energy_hangover_frames: u32,
    pub webrtc_aggressiveness: u8,
    /// Appended to the input stem when no output path is given.
    pub output_suffix: String,
    /// Log a progress line every N percent.
    pub progress_step_percent: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            vad_backend: "energy".into(),
            energy_threshold: 0.02,
            energy_hangover_frames: 0,
            webrtc_aggressiveness: 2,
            output_suffix: "isolated".into(),
            progress_step_percent: 10,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.vad_backend = normalize_vad_backend(&self.vad_backend);
        self.energy_threshold = if self.energy_threshold.is_finite() {
            self.energy_threshold.clamp(0.0, 1.0)
        } else {
            0.02
        };
        self.energy_hangover_frames = self.energy_hangover_frames.min(50);
        self.webrtc_aggressiveness = self.webrtc_aggressiveness.min(3);
        self.output_suffix = normalize_output_suffix(&self.output_suffix);
        self.progress_step_percent = self.progress_step_percent.clamp(1, 100);
    }

    /// Applies `ISOLATOR_VAD` / `ISOLATOR_VAD_THRESHOLD` from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_VAD) {
            self.vad_backend = raw;
        }
        if let Some(raw) = lookup(ENV_VAD_THRESHOLD) {
            match raw.trim().parse::<f32>() {
                Ok(v) => self.energy_threshold = v,
                Err(_) => warn!(value = %raw, "ignoring unparseable {ENV_VAD_THRESHOLD}"),
            }
        }
        self.normalize();
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        let vad_backend = self.vad_backend.parse().unwrap_or_default();
        EngineConfig {
            vad_backend,
            energy_threshold: self.energy_threshold,
            energy_hangover_frames: self.energy_hangover_frames,
            webrtc_aggressiveness: self.webrtc_aggressiveness,
        }
    }
}

pub fn normalize_vad_backend(raw: &str) -> String {
    raw.parse::<VadBackend>()
        .unwrap_or(VadBackend::Energy)
        .to_string()
}

fn normalize_output_suffix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('.');
    if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
        "isolated".into()
    } else {
        trimmed.into()
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Isolator")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("isolator")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<AppSettings>(&raw).unwrap_or_else(|e| {
            warn!(path = %path.display(), "malformed settings file, using defaults: {e}");
            AppSettings::default()
        }),
        Err(_) => AppSettings::default(),
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}
