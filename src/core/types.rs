use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, Error, Result};

/// Well-known name prefix of the services the bridge talks to
pub const SERVICE_PREFIX: &str = "zfkd.dbus.";

/// Object path prefix of the services the bridge talks to
pub const PATH_PREFIX: &str = "/zfkd/dbus/";

/// Address of one remote method on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Bus name of the owning service
    pub service: String,
    /// Object path
    pub path: String,
    /// Interface name
    pub interface: String,
    /// Method name
    pub method: String,
}

impl Endpoint {
    /// Builds the endpoint for `method` on the service called `who`
    pub fn for_service(who: &str, method: &str) -> Self {
        Endpoint {
            service: format!("{SERVICE_PREFIX}{who}"),
            path: format!("{PATH_PREFIX}{who}"),
            interface: format!("{SERVICE_PREFIX}{who}"),
            method: method.to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}.{}", self.service, self.path, self.interface, self.method)
    }
}

/// Inclusive range of wire identifiers used to address outgoing frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    /// Wire identifier of the first frame
    pub start_id: u32,
    /// Highest wire identifier that may be written
    pub end_id: u32,
}

impl FrameRange {
    /// Creates a new frame range
    pub fn new(start_id: u32, end_id: u32) -> Self {
        FrameRange { start_id, end_id }
    }

    /// Wire identifier of the frame at `position`, if it stays inside the range
    pub fn wire_id(&self, position: usize) -> Option<u32> {
        let offset = u32::try_from(position).ok()?;
        let id = self.start_id.checked_add(offset)?;
        (id <= self.end_id).then_some(id)
    }

    /// Number of frames the range can address
    pub fn capacity(&self) -> usize {
        if self.start_id > self.end_id {
            0
        } else {
            (self.end_id - self.start_id) as usize + 1
        }
    }
}

/// Which message bus the RPC client connects to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    /// The system bus
    #[default]
    System,
    /// The per-user session bus
    Session,
}

/// Answer frame range of one action, as written in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerConfig {
    /// First wire identifier (hex string)
    pub start_id: String,
    /// Last wire identifier (hex string)
    pub end_id: String,
}

/// One action entry of the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Target service name
    pub who: String,
    /// Remote method name, also the name of the codec used for the reply
    pub method: String,
    /// Frame identifier range of the answer
    pub answer: AnswerConfig,
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Device path
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Inter-character read timeout
    pub read_timeout: Duration,
}

/// Configuration for the bridge daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Serial device, used when none is given on the command line
    #[serde(default)]
    pub file: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Serial inter-character timeout
    #[serde(
        default = "default_timeout",
        rename = "timeout_ms",
        serialize_with = "super::serde::serialize_millis",
        deserialize_with = "super::serde::deserialize_millis"
    )]
    pub read_timeout: Duration,
    /// Bus the RPC client connects to
    #[serde(default)]
    pub bus: BusKind,
    /// Identifier string to action mapping
    pub actions: BTreeMap<String, ActionConfig>,
}

fn default_baud_rate() -> u32 {
    super::DEFAULT_BAUD_RATE
}

fn default_timeout() -> Duration {
    super::DEFAULT_READ_TIMEOUT
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file: None,
            baud_rate: default_baud_rate(),
            read_timeout: default_timeout(),
            bus: BusKind::default(),
            actions: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parses a configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.into()))
    }

    /// Loads the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(ConfigError::Document(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        })?;
        Self::from_json(&text)
    }

    /// Serial settings, preferring `device` over the configured `file`
    pub fn serial_settings(&self, device: Option<String>) -> Result<SerialSettings> {
        let device = device
            .or_else(|| self.file.clone())
            .ok_or(ConfigError::MissingDevice)?;

        Ok(SerialSettings {
            device,
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
        })
    }
}
