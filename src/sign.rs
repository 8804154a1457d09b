//! Request signing.
//!
//! RSA-PKCS#1v1.5 over a SHA-256 digest of the canonical string, base64
//! encoded. This is the `RSA2` signature type.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1v15::SigningKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer as _};
use rsa::RsaPrivateKey;

use crate::canonical::canonical_string;
use crate::envelope::{encode_query, RequestEnvelope, SignedEnvelope};
use crate::{Result, XpayError};

/// Produces signatures and transport encodings for outbound requests.
///
/// Holds the caller's identity and private key, plus the certificate routing
/// serials in certificate mode. Immutable after construction; signing is a
/// pure function of the envelope and may run concurrently.
#[derive(Clone)]
pub struct Signer {
    app_id: String,
    signing_key: SigningKey<Sha256>,
    app_cert_sn: Option<String>,
    root_cert_sn: Option<String>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("app_id", &self.app_id)
            .field("signing_key", &"<redacted>")
            .field("app_cert_sn", &self.app_cert_sn)
            .field("root_cert_sn", &self.root_cert_sn)
            .finish()
    }
}

impl Signer {
    /// Create a signer for `app_id` with the caller's private key.
    pub fn new(app_id: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            app_id: app_id.into(),
            signing_key: SigningKey::<Sha256>::new(private_key),
            app_cert_sn: None,
            root_cert_sn: None,
        }
    }

    /// Attach the certificate routing serials sent with every request in
    /// certificate mode.
    pub fn with_cert_serials(
        mut self,
        app_cert_sn: impl Into<String>,
        root_cert_sn: impl Into<String>,
    ) -> Self {
        self.app_cert_sn = Some(app_cert_sn.into());
        self.root_cert_sn = Some(root_cert_sn.into());
        self
    }

    /// The application id this signer stamps onto envelopes.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Sign a canonical string, returning the base64 signature.
    pub fn sign(&self, canonical: &str) -> Result<String> {
        let signature = self
            .signing_key
            .try_sign(canonical.as_bytes())
            .map_err(|e| XpayError::Signing(e.to_string()))?;
        Ok(STANDARD.encode(signature.to_bytes()))
    }

    /// Build the signed form of a request without mutating the input.
    ///
    /// Stamps `app_id` and the certificate routing serials onto a copy of the
    /// envelope, canonicalizes, signs, and form-encodes the full parameter
    /// set including the computed `sign`.
    pub fn build_signed_envelope(&self, envelope: &RequestEnvelope) -> Result<SignedEnvelope> {
        let mut envelope = envelope.clone();
        envelope.app_id = self.app_id.clone();
        envelope.app_cert_sn = self.app_cert_sn.clone();
        envelope.alipay_root_cert_sn = self.root_cert_sn.clone();

        let fields = envelope.fields();
        let canonical = canonical_string(fields.iter().copied());
        let signature = self.sign(&canonical)?;
        let encoded_query = encode_query(&fields, &signature);

        Ok(SignedEnvelope {
            canonical_string: canonical,
            signature,
            encoded_query,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn test_signer() -> Signer {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("keygen");
        Signer::new("2014072300007148", key)
    }

    fn test_envelope() -> RequestEnvelope {
        RequestEnvelope::new(&ClientConfig::sandbox(), "alipay.trade.query", "2023-01-01 00:00:00")
            .with_biz_content(r#"{"out_trade_no":"X"}"#)
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = test_signer();
        let a = signer.sign("a=1&b=2").unwrap();
        let b = signer.sign("a=1&b=2").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, signer.sign("a=1&b=3").unwrap());
    }

    #[test]
    fn test_empty_message_signs() {
        let signer = test_signer();
        // Zero eligible parameters is legal and signs as the empty message.
        assert!(!signer.sign("").unwrap().is_empty());
    }

    #[test]
    fn test_build_does_not_mutate_input() {
        let signer = test_signer();
        let envelope = test_envelope();
        let before = format!("{envelope:?}");
        signer.build_signed_envelope(&envelope).unwrap();
        assert_eq!(before, format!("{envelope:?}"));
        assert!(envelope.app_id.is_empty());
    }

    #[test]
    fn test_build_stamps_identity_and_serials() {
        let signer = test_signer().with_cert_serials("aaaa", "bbbb_cccc");
        let signed = signer.build_signed_envelope(&test_envelope()).unwrap();
        assert!(signed.canonical_string.contains("app_id=2014072300007148"));
        assert!(signed.canonical_string.contains("app_cert_sn=aaaa"));
        assert!(signed.canonical_string.contains("alipay_root_cert_sn=bbbb_cccc"));
        assert!(signed.encoded_query.contains("sign="));
        // The signature marker is sent but never signed.
        assert!(!signed.canonical_string.contains("sign_type"));
        assert!(signed.encoded_query.contains("sign_type=RSA2"));
    }
}
