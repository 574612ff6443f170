use std::io;
use thiserror::Error;

/// Errors raised while turning the configuration document into a registry.
///
/// All of these are startup-fatal: the daemon refuses to run with a partial
/// action table.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Document(String),

    #[error("malformed action identifier {id:?}: expected a hexadecimal byte")]
    MalformedId { id: String },

    #[error("malformed {field} {value:?} for action {id}: expected a hexadecimal frame identifier")]
    MalformedRange {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("action {id} names unknown codec {method:?}")]
    UnknownCodec { id: String, method: String },

    #[error("action identifier {id} is configured more than once")]
    DuplicateId { id: String },

    #[error("no serial device given on the command line or under \"file\" in the configuration")]
    MissingDevice,
}

/// Errors that abort a single dispatch cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("no action registered for identifier {0:#04X}")]
    UnknownAction(u8),

    #[error("reply carries no data")]
    MissingData,

    #[error("reply data is not a byte array: {0}")]
    MalformedReply(String),
}

/// Custom error types for the bridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new device error
    pub fn device(msg: impl Into<String>) -> Self {
        Error::Device(msg.into())
    }

    /// Creates a new RPC error
    pub fn rpc(msg: impl Into<String>) -> Self {
        Error::Rpc(msg.into())
    }

    /// Whether the error only aborts the current dispatch cycle.
    ///
    /// Configuration and device errors are fatal at startup; everything else
    /// is logged and the dispatcher goes back to waiting for an identifier.
    pub fn is_cycle_local(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Rpc(_) | Error::Protocol(_))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Document(err.to_string())
    }
}
