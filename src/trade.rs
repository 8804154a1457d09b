//! Trade endpoint request/response types.
//!
//! One representative query endpoint plus the page-pay request used with
//! [`crate::client::Client::page_url`]. The wider endpoint catalogue follows
//! the same shapes.

use serde::{Deserialize, Serialize};

use crate::client::GatewayRequest;
use crate::{Result, XpayError};

/// Trade lifecycle states reported by the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Trade created, waiting for the buyer to pay.
    #[serde(rename = "WAIT_BUYER_PAY")]
    WaitBuyerPay,
    /// Unpaid trade timed out, or paid and fully refunded.
    #[serde(rename = "TRADE_CLOSED")]
    TradeClosed,
    /// Payment succeeded.
    #[serde(rename = "TRADE_SUCCESS")]
    TradeSuccess,
    /// Trade finished, no further refunds possible.
    #[serde(rename = "TRADE_FINISHED")]
    TradeFinished,
}

/// Product code for PC web page payment.
pub const FAST_INSTANT_TRADE_PAY: &str = "FAST_INSTANT_TRADE_PAY";

/// Product code for mobile web payment.
pub const QUICK_WAP_WAY: &str = "QUICK_WAP_WAY";

/// alipay.trade.query: query one trade by merchant or gateway order number.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TradeQueryRequest {
    /// Merchant order number; either this or `trade_no` is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_trade_no: Option<String>,
    /// Gateway trade number; either this or `out_trade_no` is required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_no: Option<String>,
    /// Extra response fields to request.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub query_options: Vec<String>,
}

impl GatewayRequest for TradeQueryRequest {
    fn method(&self) -> &'static str {
        "alipay.trade.query"
    }

    fn validate(&self) -> Result<()> {
        if self.out_trade_no.is_none() && self.trade_no.is_none() {
            return Err(XpayError::invalid_request(
                "out_trade_no",
                "either out_trade_no or trade_no is required",
            ));
        }
        Ok(())
    }
}

/// Common head of every business response.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResponseHead {
    /// Gateway result code; `10000` means success.
    pub code: String,
    /// Result message.
    #[serde(default)]
    pub msg: String,
    /// Business error code, set on failure.
    #[serde(default)]
    pub sub_code: Option<String>,
    /// Business error message, set on failure.
    #[serde(default)]
    pub sub_msg: Option<String>,
}

impl ResponseHead {
    /// True when the business call succeeded.
    pub fn success(&self) -> bool {
        self.code == "10000"
    }
}

/// alipay.trade.query response content.
#[derive(Clone, Debug, Deserialize)]
pub struct TradeQueryResponse {
    /// Result head shared by all endpoints.
    #[serde(flatten)]
    pub head: ResponseHead,
    /// Gateway trade number.
    #[serde(default)]
    pub trade_no: Option<String>,
    /// Merchant order number.
    #[serde(default)]
    pub out_trade_no: Option<String>,
    /// Buyer login id, masked.
    #[serde(default)]
    pub buyer_logon_id: Option<String>,
    /// Current trade status.
    #[serde(default)]
    pub trade_status: Option<TradeStatus>,
    /// Order amount in yuan, two decimal places.
    #[serde(default)]
    pub total_amount: Option<String>,
    /// Amount actually received by the merchant.
    #[serde(default)]
    pub receipt_amount: Option<String>,
    /// Buyer user id.
    #[serde(default)]
    pub buyer_user_id: Option<String>,
}

/// alipay.trade.page.pay: create an order and redirect the buyer to the
/// payment page. Used with [`crate::client::Client::page_url`].
#[derive(Clone, Debug, Serialize)]
pub struct TradePagePayRequest {
    /// Merchant order number, unique per merchant.
    pub out_trade_no: String,
    /// Order amount in yuan, two decimal places.
    pub total_amount: String,
    /// Order title.
    pub subject: String,
    /// Sales product code, `FAST_INSTANT_TRADE_PAY` for page payment.
    pub product_code: String,
    /// Webhook URL, sent in the envelope rather than the business content.
    #[serde(skip)]
    pub notify_url: Option<String>,
    /// Redirect URL, sent in the envelope rather than the business content.
    #[serde(skip)]
    pub return_url: Option<String>,
}

impl GatewayRequest for TradePagePayRequest {
    fn method(&self) -> &'static str {
        "alipay.trade.page.pay"
    }

    fn notify_url(&self) -> Option<&str> {
        self.notify_url.as_deref()
    }

    fn return_url(&self) -> Option<&str> {
        self.return_url.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.out_trade_no.is_empty() {
            return Err(XpayError::invalid_request("out_trade_no", "must not be empty"));
        }
        if self.total_amount.is_empty() {
            return Err(XpayError::invalid_request("total_amount", "must not be empty"));
        }
        if self.subject.is_empty() {
            return Err(XpayError::invalid_request("subject", "must not be empty"));
        }
        Ok(())
    }
}
