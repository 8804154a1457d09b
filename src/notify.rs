//! Asynchronous webhook notifications.
//!
//! The gateway POSTs trade status changes as form-encoded fields, signed with
//! the same discipline as outbound requests: the canonical string of every
//! received field minus `sign` and `sign_type`. Verification must pass before
//! the notification is handed to business code; a rejected notification must
//! never mark an order paid.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_string;
use crate::trade::TradeStatus;
use crate::verify::{VerificationScene, Verifier};
use crate::{Result, XpayError};

/// A verified asynchronous trade notification.
///
/// Field meanings follow the gateway's notification documentation; everything
/// the gateway may omit is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TradeNotification {
    /// Notification send time, `yyyy-MM-dd HH:mm:ss`.
    pub notify_time: String,
    /// Notification type, e.g. `trade_status_sync`.
    pub notify_type: String,
    /// Notification id.
    pub notify_id: String,
    /// Charset of the notification.
    pub charset: String,
    /// Interface version, fixed `1.0`.
    pub version: String,
    /// Signature algorithm, `RSA2`.
    pub sign_type: String,
    /// Signature over the canonical field string.
    pub sign: String,
    /// Authorized application id; currently always equals `app_id`.
    #[serde(default)]
    pub auth_app_id: String,
    /// Gateway trade number.
    #[serde(default)]
    pub trade_no: String,
    /// Application id of the receiving merchant.
    pub app_id: String,
    /// Merchant order number from the original request.
    #[serde(default)]
    pub out_trade_no: String,
    /// Merchant business number, e.g. a refund request id.
    #[serde(default)]
    pub out_biz_no: Option<String>,
    /// Buyer account id.
    #[serde(default)]
    pub buyer_id: Option<String>,
    /// Seller account id.
    #[serde(default)]
    pub seller_id: Option<String>,
    /// Current trade status.
    #[serde(default)]
    pub trade_status: Option<TradeStatus>,
    /// Order amount in yuan.
    #[serde(default)]
    pub total_amount: Option<String>,
    /// Amount actually received.
    #[serde(default)]
    pub receipt_amount: Option<String>,
    /// Invoiceable amount.
    #[serde(default)]
    pub invoice_amount: Option<String>,
    /// Amount the buyer paid.
    #[serde(default)]
    pub buyer_pay_amount: Option<String>,
    /// Total refunded amount, set on refund notifications.
    #[serde(default)]
    pub refund_fee: Option<String>,
    /// Order title, echoed from the request.
    #[serde(default)]
    pub subject: Option<String>,
    /// Order description, echoed from the request.
    #[serde(default)]
    pub body: Option<String>,
    /// Trade creation time.
    #[serde(default)]
    pub gmt_create: Option<String>,
    /// Payment time.
    #[serde(default)]
    pub gmt_payment: Option<String>,
    /// Refund time.
    #[serde(default)]
    pub gmt_refund: Option<String>,
    /// Close time.
    #[serde(default)]
    pub gmt_close: Option<String>,
    /// Paid-channel breakdown, JSON text.
    #[serde(default)]
    pub fund_bill_list: Option<String>,
    /// Voucher breakdown, JSON text.
    #[serde(default)]
    pub voucher_detail_list: Option<String>,
    /// Pass-back parameters echoed from the request.
    #[serde(default)]
    pub passback_params: Option<String>,
    /// Certificate serial, present in certificate mode.
    #[serde(default)]
    pub alipay_cert_sn: Option<String>,
}

/// Decode a form-encoded notification body into a field map.
///
/// Later duplicates of a key win, matching typical form-parsing behavior.
pub fn parse_form(body: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let value = decode_component(value);
        fields.insert(key, value);
    }
    fields
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(raw)
}

/// Verify a notification field map and deserialize it.
///
/// The canonical string over every received field (minus `sign` and
/// `sign_type`) is checked against the `sign` field using the asynchronous
/// scene; the `alipay_cert_sn` field is passed through as the key hint.
pub fn verify_notification(
    verifier: &Verifier,
    fields: &HashMap<String, String>,
) -> Result<TradeNotification> {
    let canonical = canonical_string(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let sign = fields.get("sign").map(String::as_str).unwrap_or_default();
    let hint = fields.get("alipay_cert_sn").map(String::as_str);

    if let Err(err) = verifier.verify(VerificationScene::Asynchronous, sign, canonical.as_bytes(), hint) {
        tracing::warn!(error = %err, "notification signature rejected");
        return Err(err);
    }
    tracing::debug!(notify_id = fields.get("notify_id").map(String::as_str), "notification verified");

    let value = serde_json::to_value(fields).map_err(XpayError::from)?;
    serde_json::from_value(value).map_err(XpayError::from)
}

/// Parse and verify a raw form-encoded notification body.
pub fn verify_notification_body(verifier: &Verifier, body: &str) -> Result<TradeNotification> {
    verify_notification(verifier, &parse_form(body))
}
