//! Notifications sent from the bridge to its embedder.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::Arc;

use transport::Value;

/// Fixed text of the `error` notification sent when no drawing surface appears.
pub const SURFACE_UNAVAILABLE_MESSAGE: &str = "2D drawing surface not supported!";

/// Tagged message posted back to the embedding page or controller.
///
/// Serialises as `{"kind": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Informational log line.
    Log(String),
    /// Fatal startup error.
    Error(String),
    /// Sent exactly once after the drawing surface is installed.
    InitDone,
    /// Guest-originated notification posted through the `postMessage` import.
    Custom {
        /// Notification kind.
        kind: Arc<str>,
        /// Notification payload.
        data: Value,
    },
}

impl Outbound {
    /// Wire kind of the notification.
    pub fn kind(&self) -> &str {
        match self {
            Outbound::Log(_) => "log",
            Outbound::Error(_) => "error",
            Outbound::InitDone => "initDone",
            Outbound::Custom { kind, .. } => kind.as_ref(),
        }
    }
}

impl Serialize for Outbound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Outbound", 2)?;
        state.serialize_field("kind", self.kind())?;
        match self {
            Outbound::Log(text) | Outbound::Error(text) => state.serialize_field("data", text)?,
            Outbound::InitDone => state.serialize_field("data", &Value::Null)?,
            Outbound::Custom { data, .. } => state.serialize_field("data", data)?,
        }
        state.end()
    }
}

/// Receiver of outbound notifications.
pub trait OutboundSink {
    /// Posts `message` to the embedder.
    fn post(&self, message: Outbound);
}

impl<F> OutboundSink for F
where
    F: Fn(Outbound),
{
    fn post(&self, message: Outbound) {
        self(message)
    }
}
