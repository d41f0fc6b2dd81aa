//! Boundary primitives shared by the host controller and guest bindings.
//!
//! Nothing in this crate knows about a particular guest runtime:
//! * [`ObjectTable`] – append-only handle ↔ value registry; handles are the only
//!   cross-boundary reference type.
//! * [`MessageChannel`] – multi-producer, single-consumer queue drained in
//!   whole [`Batch`]es; the consumer parks in [`MessageChannel::drain`].
//! * [`Value`] / [`Message`] – the opaque payloads that travel through both.
//! * [`TransportError`] – lightweight error surface for handle lookups.

mod channel;
mod error;
mod object_table;
mod value;

pub use channel::{Batch, Drain, MessageChannel};
pub use error::{TransportError, TransportResult};
pub use object_table::{Handle, ObjectTable};
pub use value::{Message, Value};
