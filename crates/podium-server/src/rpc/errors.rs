//! Gateway error type and wire codes.

use podium_core::LiveError;

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";

/// Error returned by method handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Rejected by the live-session state machine.
    #[error(transparent)]
    Live(#[from] LiveError),

    /// Malformed request frame or parameters.
    #[error("{message}")]
    InvalidParams {
        /// What is wrong.
        message: String,
    },

    /// No handler for the method.
    #[error("Method '{method}' not found")]
    MethodNotFound {
        /// Requested method.
        method: String,
    },

    /// Unexpected failure.
    #[error("{message}")]
    Internal {
        /// Description (never sent to clients).
        message: String,
    },
}

impl RpcError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Live(e) => e.code(),
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::MethodNotFound { .. } => METHOD_NOT_FOUND,
            Self::Internal { .. } => INTERNAL_ERROR,
        }
    }

    /// Shorthand for [`RpcError::InvalidParams`].
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}
