use serde_json::Value;
use tracing::debug;
use zbus::blocking::Connection;

use crate::core::{BusKind, Endpoint, Error, Result};
use super::{ReplyPayload, RpcClient};

/// RPC client over D-Bus.
///
/// Requests and replies travel as a single JSON string argument; the reply
/// string is parsed back into a [`ReplyPayload`].
pub struct DbusClient {
    connection: Connection,
}

impl DbusClient {
    /// Connects to the given bus
    pub fn connect(bus: BusKind) -> Result<Self> {
        let connection = match bus {
            BusKind::System => Connection::system(),
            BusKind::Session => Connection::session(),
        }
        .map_err(|e| Error::rpc(format!("Failed to connect to {:?} bus: {}", bus, e)))?;

        Ok(DbusClient { connection })
    }
}

impl RpcClient for DbusClient {
    fn invoke(&mut self, endpoint: &Endpoint, request: &Value) -> Result<ReplyPayload> {
        let body = request.to_string();
        debug!(%endpoint, %body, "calling method");

        let reply = self
            .connection
            .call_method(
                Some(endpoint.service.as_str()),
                endpoint.path.as_str(),
                Some(endpoint.interface.as_str()),
                endpoint.method.as_str(),
                &body,
            )
            .map_err(|e| Error::rpc(format!("{} failed: {}", endpoint, e)))?;

        let text: String = reply
            .body()
            .deserialize()
            .map_err(|e| Error::rpc(format!("{} returned an unexpected body: {}", endpoint, e)))?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| Error::rpc(format!("{} returned invalid JSON: {}", endpoint, e)))?;

        Ok(ReplyPayload::new(value))
    }
}
