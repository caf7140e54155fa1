use std::path::PathBuf;
use thiserror::Error;

/// Failures the engine reports with enough structure for callers to act on.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no {kind} model configured; pass {flag}, set {env}, or set models.{key} in the config")]
    MissingModel {
        kind: &'static str,
        flag: &'static str,
        env: &'static str,
        key: &'static str,
    },

    #[error("reading {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid {expected}: {message}")]
    InvalidJson {
        path: PathBuf,
        expected: &'static str,
        message: String,
    },
}
