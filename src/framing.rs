//! Response framing: locating the exact bytes a signature covers.
//!
//! The gateway signs the raw text of the response-content property, not a
//! re-serialized form of it, so extraction is textual and must operate on the
//! body exactly as received. The signed substring runs from just past the
//! first `_response":` marker to the start of the trailing
//! `,"alipay_cert_sn":` property, or `,"sign":` when no certificate serial is
//! present.
//!
//! The marker rule is dictated by the gateway's actual output shape. When the
//! markers cannot be located the extraction fails loudly instead of guessing.

use crate::{Result, XpayError};

const RESPONSE_MARKER: &str = "_response\":";
const CERT_SN_MARKER: &str = ",\"alipay_cert_sn\":";
const SIGN_MARKER: &str = ",\"sign\":";
const HTML_MARKER: &str = "<html>";
const ERROR_RESPONSE_MARKER: &str = "error_response\":";

/// Extract the signed substring from a raw synchronous response body.
pub fn signed_region(body: &str) -> Result<&str> {
    let start = body
        .find(RESPONSE_MARKER)
        .map(|index| index + RESPONSE_MARKER.len())
        .ok_or(XpayError::MissingSignedRegion)?;

    if let Some(end) = body.find(CERT_SN_MARKER) {
        if end > start {
            return Ok(&body[start..end]);
        }
    }
    match body.find(SIGN_MARKER) {
        Some(end) if end >= start => Ok(&body[start..end]),
        _ => Err(XpayError::MissingSignedRegion),
    }
}

/// True when the body is an HTML error page rather than structured JSON.
pub fn is_html_error(body: &str) -> bool {
    body.contains(HTML_MARKER)
}

/// True when the body carries the gateway's `error_response` envelope.
pub fn is_error_response(body: &str) -> bool {
    body.contains(ERROR_RESPONSE_MARKER)
}
