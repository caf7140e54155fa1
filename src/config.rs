use crate::error::EngineError;
use anyhow::{Context, Result};
use facegate_vision::localize::DetectorTuning;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_CONFIG_PATH").unwrap_or("/usr/local/etc/facegate/config.toml"))
});

pub const DETECTOR_MODEL_ENV: &str = "FACEGATE_DETECTOR_MODEL";
pub const LANDMARK_MODEL_ENV: &str = "FACEGATE_LANDMARK_MODEL";
pub const ENCODER_MODEL_ENV: &str = "FACEGATE_ENCODER_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest embedding-space distance still accepted as the same person.
    pub tolerance: f32,
    /// Angular score floor when a learned embedder is active.
    pub match_threshold: f32,
    /// Angular score floor for hand-crafted fallback encodings.
    pub fallback_threshold: f32,
    pub detector: DetectorConfig,
    pub models: ModelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: 0.6,
            match_threshold: 0.3,
            fallback_threshold: 0.7,
            detector: DetectorConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

/// Cascade sweep settings for probe encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub scale_step: f32,
    pub min_neighbors: u32,
    pub min_size: u32,
    // Absent key means uncapped, so this field must not refill from
    // the struct-level default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let tuning = DetectorTuning::default();
        Self {
            scale_step: tuning.scale_step,
            min_neighbors: tuning.min_neighbors,
            min_size: tuning.min_size,
            max_size: tuning.max_size,
        }
    }
}

impl DetectorConfig {
    pub fn tuning(&self) -> DetectorTuning {
        DetectorTuning {
            scale_step: self.scale_step,
            min_neighbors: self.min_neighbors,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }
}

/// On-disk model locations. Every entry can also arrive via flag or
/// environment, so all of them are optional here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detector: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<PathBuf>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

fn resolve(flag: Option<&Path>, env_key: &str, configured: Option<&Path>) -> Option<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| std::env::var_os(env_key).map(PathBuf::from))
        .or_else(|| configured.map(Path::to_path_buf))
}

/// Locate the cascade detector model: flag beats environment beats config.
pub fn detector_model(flag: Option<&Path>, cfg: &Config) -> Result<PathBuf, EngineError> {
    resolve(flag, DETECTOR_MODEL_ENV, cfg.models.detector.as_deref()).ok_or(
        EngineError::MissingModel {
            kind: "face detector",
            flag: "--detector-model",
            env: DETECTOR_MODEL_ENV,
            key: "detector",
        },
    )
}

pub fn landmark_model(flag: Option<&Path>, cfg: &Config) -> Result<PathBuf, EngineError> {
    resolve(flag, LANDMARK_MODEL_ENV, cfg.models.landmarks.as_deref()).ok_or(
        EngineError::MissingModel {
            kind: "landmark predictor",
            flag: "--landmark-model",
            env: LANDMARK_MODEL_ENV,
            key: "landmarks",
        },
    )
}

pub fn encoder_model(flag: Option<&Path>, cfg: &Config) -> Result<PathBuf, EngineError> {
    resolve(flag, ENCODER_MODEL_ENV, cfg.models.encoder.as_deref()).ok_or(
        EngineError::MissingModel {
            kind: "face encoder",
            flag: "--encoder-model",
            env: ENCODER_MODEL_ENV,
            key: "encoder",
        },
    )
}
