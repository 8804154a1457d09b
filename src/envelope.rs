//! Request envelope and transport encoding.
//!
//! The envelope carries the common fields every gateway call sends alongside
//! the opaque `biz_content` blob. Signing never mutates a caller's envelope:
//! [`crate::sign::Signer::build_signed_envelope`] works on a copy and returns
//! the finished [`SignedEnvelope`].

use serde::Serialize;

use crate::canonical::SIGN_KEY;
use crate::config::ClientConfig;

/// Common request parameters for one gateway call.
///
/// Optional fields that stay `None` are omitted from both the canonical
/// string and the encoded query.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RequestEnvelope {
    /// Application id assigned by the gateway.
    pub app_id: String,
    /// Interface name, e.g. `alipay.trade.query`.
    pub method: String,
    /// Response format, only `JSON` is supported.
    pub format: String,
    /// Redirect URL for page endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    /// Request charset.
    pub charset: String,
    /// Signature algorithm marker, `RSA2`.
    pub sign_type: String,
    /// Request time, `yyyy-MM-dd HH:mm:ss`.
    pub timestamp: String,
    /// API version, fixed `1.0`.
    pub version: String,
    /// Webhook URL for asynchronous notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,
    /// Third-party application authorization token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_auth_token: Option<String>,
    /// Opaque business-content JSON blob.
    pub biz_content: String,
    /// Serial of the caller's public-key certificate (certificate mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_cert_sn: Option<String>,
    /// Joined serials of the counterparty root chain (certificate mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alipay_root_cert_sn: Option<String>,
}

impl RequestEnvelope {
    /// Create an envelope for `method` with the configured protocol defaults.
    pub fn new(config: &ClientConfig, method: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            format: config.format.clone(),
            charset: config.charset.clone(),
            sign_type: config.sign_type.clone(),
            timestamp: timestamp.into(),
            version: config.version.clone(),
            ..Self::default()
        }
    }

    /// Set the business-content blob.
    pub fn with_biz_content(mut self, biz_content: impl Into<String>) -> Self {
        self.biz_content = biz_content.into();
        self
    }

    /// Set the webhook URL unless empty.
    pub fn with_notify_url(mut self, notify_url: Option<&str>) -> Self {
        self.notify_url = notify_url.filter(|u| !u.is_empty()).map(str::to_string);
        self
    }

    /// Set the redirect URL unless empty.
    pub fn with_return_url(mut self, return_url: Option<&str>) -> Self {
        self.return_url = return_url.filter(|u| !u.is_empty()).map(str::to_string);
        self
    }

    /// Set the application authorization token unless empty.
    pub fn with_app_auth_token(mut self, token: Option<&str>) -> Self {
        self.app_auth_token = token.filter(|t| !t.is_empty()).map(str::to_string);
        self
    }

    /// Flatten the envelope into key/value pairs, skipping unset options.
    pub(crate) fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut pairs: Vec<(&'static str, &str)> = vec![
            ("app_id", &self.app_id),
            ("method", &self.method),
            ("format", &self.format),
            ("charset", &self.charset),
            ("sign_type", &self.sign_type),
            ("timestamp", &self.timestamp),
            ("version", &self.version),
            ("biz_content", &self.biz_content),
        ];
        let optional: [(&'static str, &Option<String>); 5] = [
            ("return_url", &self.return_url),
            ("notify_url", &self.notify_url),
            ("app_auth_token", &self.app_auth_token),
            ("app_cert_sn", &self.app_cert_sn),
            ("alipay_root_cert_sn", &self.alipay_root_cert_sn),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value));
            }
        }
        pairs
    }
}

/// Result of signing one request: everything the transport needs, with the
/// inputs it was computed from.
#[derive(Clone, Debug)]
pub struct SignedEnvelope {
    /// The exact string the signature covers.
    pub canonical_string: String,
    /// Base64 RSA-SHA256 signature over the canonical string.
    pub signature: String,
    /// Form-encoded request body including the `sign` field.
    pub encoded_query: String,
}

/// Form-encode parameters plus the computed signature, sorted by key.
pub(crate) fn encode_query(fields: &[(&str, &str)], signature: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = fields.to_vec();
    pairs.push((SIGN_KEY, signature));
    pairs.sort_by_key(|(key, _)| *key);
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
