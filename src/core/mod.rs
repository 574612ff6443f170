//! Core types for the serial-to-RPC bridge
//!
//! This module contains the error taxonomy, the configuration document and the
//! action data model shared by the rest of the crate.

pub mod error;
pub mod serde;
pub mod types;

use std::time::Duration;

pub use self::error::{ConfigError, Error, ProtocolError, Result};
pub use self::types::{
    ActionConfig,
    AnswerConfig,
    BusKind,
    Config,
    Endpoint,
    FrameRange,
    SerialSettings,
};

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default inter-character read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/uart-rpc-bridge/config.json";
