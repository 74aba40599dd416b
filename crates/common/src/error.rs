//! Unified error type for the energy predictor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("prediction endpoint timed out after {attempts} attempts")]
    TimeoutExceeded { attempts: u32 },

    #[error("prediction request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },

    #[error("persistence error: {message}")]
    Persistence {
        code: Option<String>,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the durable store's unique-constraint violation, which the
    /// orchestrator recovers from by re-reading the existing row.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::Persistence { code: Some(c), .. } if c == "23505")
    }
}
