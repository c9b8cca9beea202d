//! Configuration types for the advert system
//!
//! This module defines the settings shared by the fetch adapter and the
//! orchestration service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Endpoint serving the advert configuration array
pub const DEFAULT_API_URL: &str = "https://60bcfd7fb8ab3700175a005b.mockapi.io/eg/ads";

/// Main advert configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertConfig {
    /// URL of the advert configuration API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account identifier passed to the tag-rendering SDK page options
    #[serde(default = "default_member_id")]
    pub member_id: u64,

    /// How long the bidding SDK may wait for bids (in milliseconds)
    #[serde(default = "default_bid_timeout_ms")]
    pub bid_timeout_ms: u64,

    /// HTTP client timeout for the configuration fetch (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AdvertConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            api_url: default_api_url(),
            member_id: default_member_id(),
            bid_timeout_ms: default_bid_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Override the API URL
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_url.is_empty() {
            return Err(crate::Error::config("API URL cannot be empty"));
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(crate::Error::config(format!(
                "API URL must use http or https: {}",
                self.api_url
            )));
        }
        if self.member_id == 0 {
            return Err(crate::Error::config("Member id must be > 0"));
        }
        if self.bid_timeout_ms == 0 {
            return Err(crate::Error::config("Bid timeout must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }

    /// Bid timeout as a duration
    pub fn bid_timeout(&self) -> Duration {
        Duration::from_millis(self.bid_timeout_ms)
    }

    /// HTTP request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AdvertConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_member_id() -> u64 {
    1543
}

fn default_bid_timeout_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    10
}
