//! Deserializable settings for building a `BarkService`.
//!
//! The library reads no environment variables or files itself; load
//! `BarkConfig` from whatever serde source the application already uses.

use std::time::Duration;

use serde::Deserialize;

use crate::error::BarkError;
use crate::http::DEFAULT_TIMEOUT;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BarkConfig {
    pub device_key: String,
    /// Relay base URLs. Empty means the public default relay.
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BarkConfig {
    pub fn new(device_key: impl Into<String>) -> Self {
        Self {
            device_key: device_key.into(),
            servers: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `timeout_secs = 0` is an error, not "no timeout": a zero request
    /// timeout would fail every push before it left the host.
    pub fn validate(&self) -> Result<(), BarkError> {
        if self.timeout_secs == 0 {
            return Err(BarkError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
