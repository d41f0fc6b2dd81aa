//! Opaque payloads carried by handles and messages.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Host-side value that can be registered in the object table or attached to a message.
///
/// Text and byte payloads are reference counted: cloning a `Value` aliases the
/// underlying buffer instead of copying it, so large uploads can be resolved
/// repeatedly without duplication.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent payload.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric payload (JavaScript-style double).
    Number(f64),
    /// UTF-8 text, e.g. level source or font descriptors.
    Text(Arc<str>),
    /// Raw bytes.
    Bytes(Arc<[u8]>),
}

impl Value {
    /// Returns the text payload, if this value is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the payload as bytes for text and byte values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Text(text) => Some(text.as_bytes()),
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Renders the value as text: text borrows, bytes decode lossily, scalars format.
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Owned(b.to_string()),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Text(text) => Cow::Borrowed(text),
            Value::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Builds a value from guest-provided bytes, preferring text when they are valid UTF-8.
    pub fn from_guest_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Value::Text(Arc::from(text)),
            Err(err) => Value::Bytes(Arc::from(err.into_bytes())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(Arc::from(text))
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(Arc::from(text))
    }
}

impl From<Arc<str>> for Value {
    fn from(text: Arc<str>) -> Self {
        Value::Text(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(Arc::from(bytes))
    }
}

impl From<Arc<[u8]>> for Value {
    fn from(bytes: Arc<[u8]>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

/// Tagged message travelling through the [`crate::MessageChannel`].
///
/// Messages are immutable once enqueued; the JSON shape is
/// `{"kind": "...", "data": ...}` with `data` defaulting to `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Routing key, e.g. `"uploadLevel"`.
    pub kind: Arc<str>,
    /// Opaque payload.
    #[serde(default)]
    pub data: Value,
}

impl Message {
    /// Creates a message from a kind and payload.
    pub fn new(kind: impl Into<Arc<str>>, data: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Creates a payload-less message.
    pub fn signal(kind: impl Into<Arc<str>>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Returns the message kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}
