//! Error handling helpers for the transport crate.
//!
//! The error surface is deliberately tiny: pushing and draining never fail, so
//! the only runtime failure is a lookup of a handle the table never issued.

use thiserror::Error;

use crate::object_table::Handle;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced by the transport primitives.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The handle was never returned by [`crate::ObjectTable::add`].
    #[error("invalid object handle {0}")]
    InvalidHandle(Handle),
}
