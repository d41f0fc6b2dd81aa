use thiserror::Error;

use transport::{Handle, TransportError};

/// Result alias for calls crossing the guest boundary.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures raised while calling into, or being called from, the guest.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A handle that the object table never issued. Fatal to the current call only.
    #[error("invalid object handle {0}")]
    InvalidHandle(Handle),

    /// The drawing surface never materialised; startup is aborted.
    #[error("drawing surface unavailable")]
    SurfaceUnavailable,

    /// The guest does not export an entry point the host tried to call.
    #[error("guest does not export `{0}`")]
    MissingExport(&'static str),

    /// The guest trapped or otherwise failed inside an export.
    #[error("guest call `{export}` failed: {message}")]
    Guest {
        /// Export that was being called.
        export: &'static str,
        /// Rendered error chain.
        message: String,
    },

    /// Copying to or from guest linear memory failed.
    #[error("guest memory access failed: {0}")]
    Memory(String),
}

impl BridgeError {
    /// Builds a [`BridgeError::Guest`] from any displayable failure.
    pub fn guest(export: &'static str, err: impl std::fmt::Display) -> Self {
        BridgeError::Guest {
            export,
            message: format!("{err:#}"),
        }
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::InvalidHandle(handle) => BridgeError::InvalidHandle(handle),
        }
    }
}

/// Persistence failures. Swallowed at the bridge boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The backing medium failed.
    #[error("storage i/o failed: {0}")]
    Io(String),

    /// The store refused the write.
    #[error("storage rejected write: {0}")]
    Rejected(String),
}
