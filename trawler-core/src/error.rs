use std::path::PathBuf;
use thiserror::Error;
use trawler_scanner::ScanError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid rule catalog {path}: {reason}")]
    RulesInvalid { path: PathBuf, reason: String },

    #[error("Parameter dictionary {0} is empty or contains only comments")]
    DictionaryEmpty(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl From<CoreError> for ScanError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Scan(inner) => inner,
            CoreError::Read { source, .. } | CoreError::Write { source, .. } => ScanError::Io(source),
            CoreError::Json(inner) => ScanError::Json(inner),
            other => ScanError::Other(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
