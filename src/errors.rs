//! Error types for gateway signing and verification.
//!
//! Every failure the engine can produce is an explicit variant here; nothing
//! is logged-and-swallowed. Callers must treat any verification-time error as
//! "do not trust this payload".

/// Comprehensive error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum XpayError {
    /// Private or public key material could not be parsed at load time.
    #[error("key material is malformed: {0}")]
    KeyFormat(String),

    /// An X.509 certificate could not be parsed at load time.
    #[error("certificate is malformed: {0}")]
    CertificateFormat(String),

    /// The response body does not contain the signed region markers.
    #[error("response does not contain a signed region")]
    MissingSignedRegion,

    /// The gateway returned an HTML error page instead of structured JSON.
    ///
    /// Distinct from signature failures so callers can tell availability
    /// problems from trust problems.
    #[error("gateway returned an error page instead of a response")]
    Gateway,

    /// The gateway returned its `error_response` envelope instead of a
    /// business response: the call never reached the addressed interface.
    #[error("gateway error response: {code} {msg}")]
    ErrorResponse {
        /// Gateway result code.
        code: String,
        /// Result message.
        msg: String,
        /// Business error code, when present.
        sub_code: Option<String>,
        /// Business error message, when present.
        sub_msg: Option<String>,
    },

    /// The reported signature is not valid base64.
    #[error("signature is not valid base64: {0}")]
    SignatureDecode(String),

    /// The certificate serial reported by the counterparty does not resolve
    /// to any loaded public-key certificate.
    #[error("no public key certificate loaded for serial {0}")]
    UnknownKey(String),

    /// A certificate-mode synchronous response carried no serial to select
    /// the verification key with.
    #[error("response carries no certificate serial to select a key")]
    MissingKeyHint,

    /// The signature did not verify against the resolved public key.
    #[error("signature verification failed")]
    SignatureMismatch,

    /// The caller-supplied deadline elapsed before the request was sent.
    #[error("deadline elapsed before the request was dispatched")]
    DeadlineExceeded,

    /// Producing a signature failed (absent or unusable private key).
    #[error("signing failed: {0}")]
    Signing(String),

    /// Request validation failed before signing.
    #[error("invalid {field}: {reason}")]
    InvalidRequest {
        /// Field or parameter name.
        field: &'static str,
        /// Reason for invalidity.
        reason: String,
    },

    /// Transport/network layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl XpayError {
    /// Create an invalid request error.
    pub fn invalid_request(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field,
            reason: reason.into(),
        }
    }

    /// Returns true if this error means the payload must be discarded as
    /// untrusted (as opposed to a transport or usage problem).
    pub fn is_trust_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingSignedRegion
                | Self::SignatureDecode(_)
                | Self::UnknownKey(_)
                | Self::MissingKeyHint
                | Self::SignatureMismatch
        )
    }
}

impl From<serde_json::Error> for XpayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for XpayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
