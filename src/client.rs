//! Gateway client.
//!
//! Drives the sign → send → verify loop for one call: builds the common
//! envelope, signs it, POSTs the form-encoded body, rejects HTML error pages,
//! verifies the response signature against the counterparty key, and only
//! then deserializes the business payload. No retries; a failed call is
//! returned to the caller as-is.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::envelope::RequestEnvelope;
use crate::framing::{is_error_response, is_html_error, signed_region};
use crate::keys;
use crate::notify::{self, TradeNotification};
use crate::sign::Signer;
use crate::verify::{VerificationScene, Verifier};
use crate::{Result, XpayError};

/// One callable gateway endpoint.
///
/// Implementations are plain serde structs whose JSON form becomes the
/// `biz_content` blob; envelope-level URLs are surfaced through the trait
/// instead of the business content.
pub trait GatewayRequest: Serialize {
    /// Interface name, e.g. `alipay.trade.query`.
    fn method(&self) -> &'static str;

    /// Webhook URL for asynchronous notifications, if the endpoint takes one.
    fn notify_url(&self) -> Option<&str> {
        None
    }

    /// Redirect URL for page endpoints, if the endpoint takes one.
    fn return_url(&self) -> Option<&str> {
        None
    }

    /// Third-party application authorization token, if acting on behalf of
    /// another merchant.
    fn app_auth_token(&self) -> Option<&str> {
        None
    }

    /// Validate the request before signing.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Signature-bearing siblings of the response content.
#[derive(Debug, Deserialize)]
struct ResponseSeal {
    #[serde(default)]
    sign: Option<String>,
    #[serde(default)]
    alipay_cert_sn: Option<String>,
}

/// Gateway-level rejection envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error_response: crate::trade::ResponseHead,
}

/// Gateway API client.
///
/// Key material is loaded once at construction and immutable afterwards;
/// calls are stateless beyond it and may run concurrently.
#[derive(Clone, Debug)]
pub struct Client {
    config: ClientConfig,
    http: reqwest::Client,
    signer: Signer,
    verifier: Verifier,
    timestamp_offset: Option<chrono::FixedOffset>,
}

impl Client {
    /// Construct a client that authenticates the counterparty with one fixed
    /// public key.
    ///
    /// Key text may be armored PEM or bare base64. Fails if any key cannot
    /// be parsed; a client is never constructed with unusable material.
    pub fn with_public_key(
        config: ClientConfig,
        app_id: impl Into<String>,
        private_key: &str,
        alipay_public_key: &str,
    ) -> Result<Self> {
        let signer = Signer::new(app_id, keys::load_private_key(private_key)?);
        let verifier = Verifier::static_key(keys::load_public_key(alipay_public_key)?);
        Self::build(config, signer, verifier)
    }

    /// Construct a client that authenticates the counterparty via rotating
    /// public-key certificates.
    ///
    /// `app_cert` is the caller's own public-key certificate, `root_certs` a
    /// bundle of concatenated root/intermediate certificates, and
    /// `alipay_cert` the counterparty's current public-key certificate.
    pub fn with_certificates(
        config: ClientConfig,
        app_id: impl Into<String>,
        private_key: &str,
        app_cert: &str,
        root_certs: &str,
        alipay_cert: &str,
    ) -> Result<Self> {
        let app_cert_sn = keys::certificate_serial(&keys::load_certificate(app_cert)?);
        let root_cert_sn = keys::load_root_chain_serial(root_certs);

        let alipay_certificate = keys::load_certificate(alipay_cert)?;
        let serial = keys::certificate_serial(&alipay_certificate);
        let public_key = keys::certificate_public_key(&alipay_certificate)?;

        let signer = Signer::new(app_id, keys::load_private_key(private_key)?)
            .with_cert_serials(app_cert_sn, root_cert_sn);
        let verifier = Verifier::certificates(vec![(serial, public_key)])?;
        Self::build(config, signer, verifier)
    }

    fn build(config: ClientConfig, signer: Signer, verifier: Verifier) -> Result<Self> {
        let timestamp_offset = match config.utc_offset_secs {
            Some(secs) => Some(chrono::FixedOffset::east_opt(secs).ok_or_else(|| {
                XpayError::invalid_request("utc_offset_secs", "offset must be within one day of UTC")
            })?),
            None => None,
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| XpayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            signer,
            verifier,
            timestamp_offset,
        })
    }

    /// The configuration this client was constructed with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The verifier, for checking webhook notifications received out of band.
    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Execute one gateway call and return the verified business response.
    ///
    /// When `deadline` is already in the past the call fails with
    /// [`XpayError::DeadlineExceeded`] before any network or cryptographic
    /// work. The response signature is verified before deserialization; an
    /// error here means the payload must not be trusted.
    pub async fn execute<Q, R>(&self, request: &Q, deadline: Option<Instant>) -> Result<R>
    where
        Q: GatewayRequest,
        R: DeserializeOwned,
    {
        request.validate()?;
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(XpayError::DeadlineExceeded);
            }
        }

        let signed = self.signer.build_signed_envelope(&self.envelope_for(request)?)?;

        let response = self
            .http
            .post(&self.config.gateway_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded;charset=utf-8",
            )
            .body(signed.encoded_query)
            .send()
            .await?;
        let body = response.text().await?;

        if is_html_error(&body) {
            tracing::warn!(method = request.method(), "gateway returned an HTML error page");
            return Err(XpayError::Gateway);
        }

        let seal: ResponseSeal = serde_json::from_str(&body)?;

        if is_error_response(&body) {
            // Error envelopes for calls rejected before dispatch (bad app_id,
            // unknown method) may carry no signature at all.
            if seal.sign.as_deref().is_some_and(|sign| !sign.is_empty()) {
                self.verifier.verify(
                    VerificationScene::Synchronous,
                    seal.sign.as_deref().unwrap_or_default(),
                    body.as_bytes(),
                    seal.alipay_cert_sn.as_deref(),
                )?;
            }
            let head = serde_json::from_str::<ErrorEnvelope>(&body)?.error_response;
            tracing::warn!(method = request.method(), code = %head.code, "gateway rejected the request");
            return Err(XpayError::ErrorResponse {
                code: head.code,
                msg: head.msg,
                sub_code: head.sub_code,
                sub_msg: head.sub_msg,
            });
        }

        self.verifier.verify(
            VerificationScene::Synchronous,
            seal.sign.as_deref().unwrap_or_default(),
            body.as_bytes(),
            seal.alipay_cert_sn.as_deref(),
        )?;

        serde_json::from_str(signed_region(&body)?).map_err(XpayError::from)
    }

    /// Build the signed redirect URL for a page endpoint without a round
    /// trip; the buyer's browser is sent to the returned URL.
    pub fn page_url<Q: GatewayRequest>(&self, request: &Q) -> Result<String> {
        request.validate()?;
        let signed = self.signer.build_signed_envelope(&self.envelope_for(request)?)?;
        Ok(format!("{}?{}", self.config.gateway_url, signed.encoded_query))
    }

    /// Verify a raw form-encoded webhook notification body.
    pub fn verify_notification_body(&self, body: &str) -> Result<TradeNotification> {
        notify::verify_notification_body(&self.verifier, body)
    }

    /// Verify an already-parsed webhook notification field map.
    pub fn verify_notification(&self, fields: &HashMap<String, String>) -> Result<TradeNotification> {
        notify::verify_notification(&self.verifier, fields)
    }

    fn envelope_for<Q: GatewayRequest>(&self, request: &Q) -> Result<RequestEnvelope> {
        let timestamp = timestamp_now(self.timestamp_offset);
        let biz_content = serde_json::to_string(request)?;
        Ok(RequestEnvelope::new(&self.config, request.method(), timestamp)
            .with_biz_content(biz_content)
            .with_notify_url(request.notify_url())
            .with_return_url(request.return_url())
            .with_app_auth_token(request.app_auth_token()))
    }
}

/// Current time as `yyyy-MM-dd HH:mm:ss`, in the given fixed offset or the
/// host's local zone.
fn timestamp_now(offset: Option<chrono::FixedOffset>) -> String {
    const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    match offset {
        Some(offset) => chrono::Utc::now()
            .with_timezone(&offset)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        None => chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::{TradePagePayRequest, TradeQueryRequest, TradeQueryResponse, FAST_INSTANT_TRADE_PAY};
    use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
    use rsa::RsaPrivateKey;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct TestKeys {
        private_pem: String,
        public_pem: String,
        signer: Signer,
    }

    fn test_keys() -> TestKeys {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("keygen");
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = private
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();
        // A second signer with the gateway-side key, to forge test responses.
        let signer = Signer::new("gateway", private);
        TestKeys {
            private_pem,
            public_pem,
            signer,
        }
    }

    fn test_client(gateway_url: &str, keys: &TestKeys) -> Client {
        Client::with_public_key(
            ClientConfig::new(gateway_url),
            "2014072300007148",
            &keys.private_pem,
            &keys.public_pem,
        )
        .unwrap()
    }

    fn query_request() -> TradeQueryRequest {
        TradeQueryRequest {
            out_trade_no: Some("X1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_construction_rejects_bad_key_material() {
        let err = Client::with_public_key(
            ClientConfig::sandbox(),
            "2014072300007148",
            "garbage",
            "also garbage",
        )
        .unwrap_err();
        assert!(matches!(err, XpayError::KeyFormat(_)));
    }

    #[tokio::test]
    async fn test_elapsed_deadline_fails_before_io() {
        let keys = test_keys();
        // Unroutable gateway: if the deadline check is skipped the call
        // would hang or fail with a transport error instead.
        let client = test_client("http://192.0.2.1:1/gateway.do", &keys);
        let deadline = Instant::now() - Duration::from_millis(10);
        let err = client
            .execute::<_, TradeQueryResponse>(&query_request(), Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, XpayError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_round_trip_with_signed_response() {
        let keys = test_keys();
        let region = r#"{"code":"10000","msg":"Success","out_trade_no":"X1","trade_status":"TRADE_SUCCESS"}"#;
        let sign = keys.signer.sign(region).unwrap();
        let body = format!(r#"{{"alipay_trade_query_response":{region},"sign":"{sign}"}}"#);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), &keys);
        let response: TradeQueryResponse = client.execute(&query_request(), None).await.unwrap();
        assert!(response.head.success());
        assert_eq!(response.out_trade_no.as_deref(), Some("X1"));
    }

    #[tokio::test]
    async fn test_tampered_response_rejected() {
        let keys = test_keys();
        let region = r#"{"code":"10000","msg":"Success","out_trade_no":"X1"}"#;
        let sign = keys.signer.sign(region).unwrap();
        // Body content differs from what was signed.
        let body = format!(
            r#"{{"alipay_trade_query_response":{{"code":"10000","msg":"Success","out_trade_no":"X2"}},"sign":"{sign}"}}"#
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), &keys);
        let err = client
            .execute::<_, TradeQueryResponse>(&query_request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, XpayError::SignatureMismatch));
    }

    #[tokio::test]
    async fn test_html_error_page_rejected_distinctly() {
        let keys = test_keys();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>502 Bad Gateway</body></html>"),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), &keys);
        let err = client
            .execute::<_, TradeQueryResponse>(&query_request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, XpayError::Gateway));
    }

    #[tokio::test]
    async fn test_error_response_surfaces_gateway_failure() {
        let keys = test_keys();
        let region = r#"{"code":"40004","msg":"Business Failed","sub_code":"ACQ.TRADE_NOT_EXIST","sub_msg":"trade not exist"}"#;
        let sign = keys.signer.sign(region).unwrap();
        let body = format!(r#"{{"error_response":{region},"sign":"{sign}"}}"#);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), &keys);
        let err = client
            .execute::<_, TradeQueryResponse>(&query_request(), None)
            .await
            .unwrap_err();
        match err {
            XpayError::ErrorResponse { code, sub_code, .. } => {
                assert_eq!(code, "40004");
                assert_eq!(sub_code.as_deref(), Some("ACQ.TRADE_NOT_EXIST"));
            }
            other => panic!("expected ErrorResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsigned_error_response_still_surfaced() {
        let keys = test_keys();
        // Calls rejected before dispatch come back without a signature.
        let body = r#"{"error_response":{"code":"40002","msg":"Invalid Arguments"},"sign":""}"#;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri(), &keys);
        let err = client
            .execute::<_, TradeQueryResponse>(&query_request(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, XpayError::ErrorResponse { ref code, .. } if code == "40002"));
    }

    #[test]
    fn test_timestamp_honors_configured_offset() {
        let offset = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        let stamp = timestamp_now(Some(offset));
        let parsed = chrono::NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").unwrap();
        let expected = chrono::Utc::now().with_timezone(&offset).naive_local();
        assert!((expected - parsed).num_seconds().abs() < 60);
    }

    #[test]
    fn test_out_of_range_offset_rejected_at_construction() {
        let keys = test_keys();
        let config = ClientConfig::sandbox().with_utc_offset_secs(2 * 86_400);
        let err = Client::with_public_key(config, "2014072300007148", &keys.private_pem, &keys.public_pem)
            .unwrap_err();
        assert!(matches!(err, XpayError::InvalidRequest { field, .. } if field == "utc_offset_secs"));
    }

    #[test]
    fn test_page_url_contains_signed_query() {
        let keys = test_keys();
        let client = test_client("https://openapi.alipay.com/gateway.do", &keys);
        let request = TradePagePayRequest {
            out_trade_no: "X1".into(),
            total_amount: "88.88".into(),
            subject: "tea".into(),
            product_code: FAST_INSTANT_TRADE_PAY.into(),
            notify_url: Some("https://merchant.example/notify".into()),
            return_url: Some("https://merchant.example/return".into()),
        };
        let url = client.page_url(&request).unwrap();
        assert!(url.starts_with("https://openapi.alipay.com/gateway.do?"));
        assert!(url.contains("method=alipay.trade.page.pay"));
        assert!(url.contains("sign="));
        assert!(url.contains("notify_url="));
        assert!(url.contains("return_url="));
    }
}
