//! Error types for the advisor.

use std::path::PathBuf;

/// All errors that can occur while running an advisor command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("{file}: {detail}")]
    Data { file: String, detail: String },

    #[error(transparent)]
    Portfolio(#[from] macrofolio::Error),

    #[error("no candidates: {0}")]
    NoCandidates(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn data(file: &std::path::Path, detail: impl Into<String>) -> Self {
        Error::Data {
            file: file.display().to_string(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
