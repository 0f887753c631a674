//! Configuration for outbound SCU operations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration applied to every association this engine opens.
///
/// Per-query parameters (endpoints, matching keys) travel in the request
/// itself; this only carries the knobs that are fixed per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScuConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Association negotiation timeout in milliseconds
    #[serde(default = "default_association_timeout")]
    pub association_timeout_ms: u64,

    /// Maximum PDU size in bytes
    #[serde(default = "default_max_pdu")]
    pub max_pdu: u32,
}

impl Default for ScuConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            association_timeout_ms: default_association_timeout(),
            max_pdu: default_max_pdu(),
        }
    }
}

impl ScuConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get association negotiation timeout as Duration
    pub fn association_timeout(&self) -> Duration {
        Duration::from_millis(self.association_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_pdu < 4096 || self.max_pdu > 131_072 {
            return Err(crate::error::FindError::config(
                "Max PDU size must be between 4096 and 131072 bytes",
            ));
        }
        if self.association_timeout_ms == 0 {
            return Err(crate::error::FindError::config(
                "Association timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_connect_timeout() -> u64 {
    10_000
}

fn default_association_timeout() -> u64 {
    10_000
}

fn default_max_pdu() -> u32 {
    16_384
}
