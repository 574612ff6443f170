//! RPC collaborator module
//!
//! The dispatcher only needs to call one remote method and get a structured
//! reply back. This module defines that seam ([`RpcClient`]), the reply
//! wrapper handed to the codecs, and the D-Bus implementation used by the
//! daemon.

#[cfg(feature = "dbus")]
mod dbus;

#[cfg(feature = "dbus")]
pub use self::dbus::DbusClient;

use bytes::Bytes;
use serde_json::{json, Value};

use crate::core::{Endpoint, ProtocolError, Result};

/// Name of the byte array field every reply must carry
pub const DATA_FIELD: &str = "data";

/// Fixed request object sent with every call
pub fn request_object() -> Value {
    json!({ "a": 0 })
}

/// Capability to invoke one remote method.
///
/// `invoke` is one of the three points where a dispatch cycle may block.
pub trait RpcClient {
    /// Calls the method at `endpoint` with `request` and returns the decoded reply
    fn invoke(&mut self, endpoint: &Endpoint, request: &Value) -> Result<ReplyPayload>;
}

impl<T: RpcClient + ?Sized> RpcClient for Box<T> {
    fn invoke(&mut self, endpoint: &Endpoint, request: &Value) -> Result<ReplyPayload> {
        (**self).invoke(endpoint, request)
    }
}

/// Structured reply of one RPC call
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyPayload {
    value: Value,
}

impl ReplyPayload {
    pub fn new(value: Value) -> Self {
        ReplyPayload { value }
    }

    /// Whether the `data` field is present and not null
    pub fn has_data(&self) -> bool {
        self.value.get(DATA_FIELD).is_some_and(|data| !data.is_null())
    }

    /// The `data` field as a byte sequence
    pub fn data_bytes(&self) -> std::result::Result<Bytes, ProtocolError> {
        let data = match self.value.get(DATA_FIELD) {
            None | Some(Value::Null) => return Err(ProtocolError::MissingData),
            Some(data) => data,
        };

        let items = data.as_array().ok_or_else(|| {
            ProtocolError::MalformedReply(format!("expected an array, found {}", data))
        })?;

        items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| ProtocolError::MalformedReply(format!("{} is not a byte", item)))
            })
            .collect::<std::result::Result<Vec<u8>, _>>()
            .map(Bytes::from)
    }

    /// The raw reply document
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl From<Value> for ReplyPayload {
    fn from(value: Value) -> Self {
        ReplyPayload::new(value)
    }
}
