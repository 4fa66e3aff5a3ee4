//! Error types shared by the sensim tools.

use std::path::Path;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SensimError>;

#[derive(Error, Debug)]
pub enum SensimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line that does not follow the expected record layout
    #[error("malformed record at {path}:{line}: {message}")]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Plotting error: {message}")]
    Plot { message: String },
}

impl SensimError {
    pub fn malformed(path: &Path, line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.display().to_string(),
            line,
            message: message.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn plot(message: impl ToString) -> Self {
        Self::Plot {
            message: message.to_string(),
        }
    }
}
