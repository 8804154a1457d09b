//! Client configuration.
//!
//! The gateway URL and the protocol defaults (`format`, `charset`,
//! `sign_type`, `version`) are an explicit immutable value handed to the
//! client at construction rather than ambient package state.

use serde::{Deserialize, Serialize};

/// Legacy sandbox gateway.
pub const SANDBOX_GATEWAY_URL: &str = "https://openapi.alipaydev.com/gateway.do";

/// Current sandbox gateway.
pub const NEW_SANDBOX_GATEWAY_URL: &str = "https://openapi-sandbox.dl.alipaydev.com/gateway.do";

/// Production gateway.
pub const PRODUCTION_GATEWAY_URL: &str = "https://openapi.alipay.com/gateway.do";

/// Only supported response format.
pub const FORMAT_JSON: &str = "JSON";

/// Default request charset.
pub const CHARSET_UTF8: &str = "utf-8";

/// RSA with SHA-256, the only signature type this engine produces.
pub const SIGN_TYPE_RSA2: &str = "RSA2";

/// Open-gateway API version.
pub const API_VERSION: &str = "1.0";

/// Configuration for the gateway client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Gateway endpoint URL.
    pub gateway_url: String,

    /// Response format sent in the `format` envelope field.
    #[serde(default = "default_format")]
    pub format: String,

    /// Charset sent in the `charset` envelope field.
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Signature type sent in the `sign_type` envelope field.
    #[serde(default = "default_sign_type")]
    pub sign_type: String,

    /// API version sent in the `version` envelope field.
    #[serde(default = "default_version")]
    pub version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Fixed UTC offset, in seconds, for the request timestamp. Local time
    /// when unset. The gateway compares timestamps in China standard time,
    /// so hosts in other zones set `8 * 3600` here.
    #[serde(default)]
    pub utc_offset_secs: Option<i32>,
}

fn default_format() -> String {
    FORMAT_JSON.to_string()
}

fn default_charset() -> String {
    CHARSET_UTF8.to_string()
}

fn default_sign_type() -> String {
    SIGN_TYPE_RSA2.to_string()
}

fn default_version() -> String {
    API_VERSION.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl ClientConfig {
    /// Create a configuration pointing at the given gateway.
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            format: default_format(),
            charset: default_charset(),
            sign_type: default_sign_type(),
            version: default_version(),
            timeout_secs: default_timeout(),
            utc_offset_secs: None,
        }
    }

    /// Configuration for the current sandbox gateway.
    pub fn sandbox() -> Self {
        Self::new(NEW_SANDBOX_GATEWAY_URL)
    }

    /// Configuration for the production gateway.
    pub fn production() -> Self {
        Self::new(PRODUCTION_GATEWAY_URL)
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set a fixed UTC offset for request timestamps.
    pub fn with_utc_offset_secs(mut self, secs: i32) -> Self {
        self.utc_offset_secs = Some(secs);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::sandbox()
    }
}
