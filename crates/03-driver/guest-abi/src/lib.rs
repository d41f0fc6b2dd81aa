//! Call-table ABI shared between the host controller and guest runtimes.
//!
//! This crate defines the trust boundary: the [`GuestAbi`] entry points the
//! host may call, and the [`HostState`] functions a guest may import. It has
//! no dependency on a particular guest runtime; `guest-wasmtime` binds these
//! to a WebAssembly instance.

#![deny(missing_docs)]

mod abi;
mod error;
mod host;
mod outbound;
mod storage;
mod surface;

pub use abi::{exports, imports, GuestAbi, ABI_VERSION};
pub use error::{BridgeError, BridgeResult, StorageError};
pub use host::{HostBuilder, HostState};
pub use outbound::{Outbound, OutboundSink, SURFACE_UNAVAILABLE_MESSAGE};
pub use storage::{DetachedSpawner, LevelStore, StoreFuture, LEVEL_KEY};
pub use surface::{Paint, Rect, RenderSurface};

pub use transport::{Batch, Handle, Message, MessageChannel, ObjectTable, Value};
