//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings load or validation failed.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid JSON.
    #[error("malformed JSON in {}: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The merged document does not fit the settings schema.
    #[error("settings do not match schema: {0}")]
    Schema(#[from] serde_json::Error),
    /// No signing secret for bearer credentials was configured.
    #[error("auth.jwtSecret is not set (use PODIUM_JWT_SECRET)")]
    MissingSecret,
    /// A field holds a value the server cannot run with.
    #[error("{field}: {reason}")]
    OutOfRange {
        /// Dotted camelCase field path.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
