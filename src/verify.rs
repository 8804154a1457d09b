//! Signature verification strategies.
//!
//! Two interchangeable strategies behind one call: a static-key strategy
//! (one fixed counterparty public key) and a certificate strategy (the
//! counterparty rotates among public-key certificates identified by serial).
//! Modeled as a tagged enum so scene/strategy handling stays exhaustive at
//! compile time.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::Verifier as _;
use rsa::RsaPublicKey;

use crate::framing::signed_region;
use crate::{Result, XpayError};

/// Which wire context governs how the signed bytes are located.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerificationScene {
    /// Raw JSON body of a synchronous HTTP response; the signed substring is
    /// extracted textually.
    Synchronous,
    /// Form fields of an asynchronous webhook notification; the payload is
    /// already the canonical string of the received fields.
    Asynchronous,
}

/// Counterparty signature verification.
#[derive(Clone, Debug)]
pub enum Verifier {
    /// One fixed counterparty public key; key hints are ignored.
    StaticKey(VerifyingKey<Sha256>),
    /// Rotating public-key certificates, routed by certificate serial.
    Certificate {
        /// Serial to verifying key, one entry per loaded certificate.
        keys: HashMap<String, VerifyingKey<Sha256>>,
        /// Serial of the most recently loaded certificate, used for the
        /// asynchronous scene which reports no serial of its own.
        current_serial: String,
    },
}

impl Verifier {
    /// Build the static-key strategy from the counterparty public key.
    pub fn static_key(public_key: RsaPublicKey) -> Self {
        Self::StaticKey(VerifyingKey::<Sha256>::new(public_key))
    }

    /// Build the certificate strategy from serial/key pairs; the last pair
    /// becomes the current key for the asynchronous scene.
    pub fn certificates<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, RsaPublicKey)>,
    {
        let mut keys = HashMap::new();
        let mut current_serial = None;
        for (serial, key) in entries {
            keys.insert(serial.clone(), VerifyingKey::<Sha256>::new(key));
            current_serial = Some(serial);
        }
        let current_serial =
            current_serial.ok_or_else(|| XpayError::CertificateFormat("no certificates loaded".to_string()))?;
        Ok(Self::Certificate { keys, current_serial })
    }

    /// Check `sign_b64` over `payload` for the given scene.
    ///
    /// `key_hint` is the certificate serial the counterparty reported; it is
    /// required (and must resolve) in the certificate strategy's synchronous
    /// scene and ignored by the static strategy. Any error means the payload
    /// must be discarded as untrusted.
    pub fn verify(
        &self,
        scene: VerificationScene,
        sign_b64: &str,
        payload: &[u8],
        key_hint: Option<&str>,
    ) -> Result<()> {
        let sign_bytes = STANDARD
            .decode(sign_b64)
            .map_err(|e| XpayError::SignatureDecode(e.to_string()))?;

        let key = self.resolve_key(scene, key_hint)?;

        let signed: &[u8] = match scene {
            VerificationScene::Synchronous => {
                let body = std::str::from_utf8(payload).map_err(|_| XpayError::MissingSignedRegion)?;
                signed_region(body)?.as_bytes()
            }
            VerificationScene::Asynchronous => payload,
        };

        let signature =
            Signature::try_from(sign_bytes.as_slice()).map_err(|_| XpayError::SignatureMismatch)?;
        key.verify(signed, &signature)
            .map_err(|_| XpayError::SignatureMismatch)
    }

    fn resolve_key(
        &self,
        scene: VerificationScene,
        key_hint: Option<&str>,
    ) -> Result<&VerifyingKey<Sha256>> {
        match self {
            Self::StaticKey(key) => Ok(key),
            Self::Certificate { keys, current_serial } => match scene {
                VerificationScene::Synchronous => {
                    let hint = key_hint
                        .filter(|hint| !hint.is_empty())
                        .ok_or(XpayError::MissingKeyHint)?;
                    keys.get(hint)
                        .ok_or_else(|| XpayError::UnknownKey(hint.to_string()))
                }
                VerificationScene::Asynchronous => keys
                    .get(current_serial)
                    .ok_or_else(|| XpayError::UnknownKey(current_serial.clone())),
            },
        }
    }
}
