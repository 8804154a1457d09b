//! Payment gateway signing client.
//!
//! This crate implements the open-gateway request/response protocol used by
//! Alipay-style payment platforms: every outbound request is canonicalized
//! and RSA-SHA256 signed, and every inbound payload (synchronous response or
//! asynchronous webhook notification) is signature-verified before any of it
//! is trusted.
//!
//! The crate stays stateless beyond the key material loaded at construction;
//! a [`Client`] may be cloned and shared across tasks freely.
//!
//! # Features
//!
//! - **Canonical signing**: deterministic parameter canonicalization and
//!   RSA-SHA256 (`RSA2`) signatures over the exact wire text
//! - **Two verification scenes**: textual framing for synchronous response
//!   bodies, canonical field strings for webhook notifications
//! - **Key rotation**: certificate-mode clients route verification keys by
//!   certificate serial
//!
//! # Example
//!
//! ```ignore
//! use xpay::{Client, ClientConfig, TradeQueryRequest, TradeQueryResponse};
//!
//! let client = Client::with_public_key(
//!     ClientConfig::sandbox(),
//!     "2014072300007148",
//!     private_key_pem,
//!     alipay_public_key_pem,
//! )?;
//!
//! let request = TradeQueryRequest {
//!     out_trade_no: Some("20150320010101001".into()),
//!     ..Default::default()
//! };
//! let response: TradeQueryResponse = client.execute(&request, None).await?;
//! assert!(response.head.success());
//! ```

pub mod canonical;
pub mod client;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod framing;
pub mod keys;
pub mod notify;
pub mod sign;
pub mod trade;
pub mod verify;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use client::{Client, GatewayRequest};
pub use config::ClientConfig;
pub use envelope::{RequestEnvelope, SignedEnvelope};
pub use errors::XpayError;
pub use notify::TradeNotification;
pub use sign::Signer;
pub use trade::{
    ResponseHead, TradePagePayRequest, TradeQueryRequest, TradeQueryResponse, TradeStatus,
};
pub use verify::{VerificationScene, Verifier};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, XpayError>;
