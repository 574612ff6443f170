//! Serial link to RPC bus bridge
//!
//! A remote peer writes a single identifier byte on a serial line. The bridge
//! resolves it to a configured action, calls the matching remote method,
//! splits the `data` array of the reply into 8-byte frames and writes them
//! back on the line under the action's frame identifier range.
pub mod core;
pub mod link;
pub mod protocol;
pub mod rpc;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Config, Error, Result};
pub use crate::protocol::{ActionRegistry, CodecRegistry, Dispatcher};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
