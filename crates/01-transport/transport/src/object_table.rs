//! Append-only handle registry backing every cross-boundary reference.
//!
//! The table is an arena: values live in a growable vector and the index is
//! the only thing either side ever passes across the boundary. There is no
//! free path, so a handle stays valid (and unique) for the lifetime of the
//! table.

use std::fmt;

use crate::error::{TransportError, TransportResult};
use crate::value::Value;

/// Opaque, process-local reference to a value registered in an [`ObjectTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// Wraps a raw handle received from the other side of the boundary.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer passed across the boundary.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Growable handle ↔ value arena.
#[derive(Debug, Default)]
pub struct ObjectTable {
    slots: Vec<Value>,
}

impl ObjectTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Registers `value` and returns a fresh handle for it.
    pub fn add(&mut self, value: impl Into<Value>) -> Handle {
        let idx = u32::try_from(self.slots.len()).expect("object table exhausted u32 handle space");
        self.slots.push(value.into());
        Handle(idx)
    }

    /// Resolves `handle` to an aliasing clone of the registered value.
    pub fn resolve(&self, handle: Handle) -> TransportResult<Value> {
        self.get(handle)
            .cloned()
            .ok_or(TransportError::InvalidHandle(handle))
    }

    /// Borrows the value registered under `handle`, if any.
    pub fn get(&self, handle: Handle) -> Option<&Value> {
        self.slots.get(handle.0 as usize)
    }

    /// Number of handles issued so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no handle has been issued yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
