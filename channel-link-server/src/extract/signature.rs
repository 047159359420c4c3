//! Signed interaction extractor

use crate::error::AppError;
use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{FromRef, FromRequest},
    http::{HeaderMap, Request},
};
use channel_link_core::common::Interaction;
use ed25519_dalek::{Signature, VerifyingKey};
use thiserror::Error;

/// Header carrying the hex-encoded ed25519 signature
pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";

/// Header carrying the timestamp that's signed along with the body
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Reasons for rejecting an interaction before looking at its contents
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signature or timestamp header missing
    #[error("Missing signature headers")]
    Missing,
    /// The signature header isn't a hex-encoded 64 byte signature
    #[error("Malformed signature")]
    Malformed,
    /// The signature doesn't match the body
    #[error("Invalid request signature")]
    Invalid,
}

/// The public key interactions are signed with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionKey(VerifyingKey);

impl InteractionKey {
    /// Parse a hex-encoded ed25519 public key
    pub fn from_hex(hex_key: &str) -> anyhow::Result<Self> {
        let bytes: [u8; 32] = hex::decode(hex_key.trim())?
            .try_into()
            .map_err(|_| anyhow::anyhow!("Interaction public key must be 32 bytes"))?;
        Ok(Self(VerifyingKey::from_bytes(&bytes)?))
    }

    /// Wrap an existing key
    pub fn new(key: VerifyingKey) -> Self {
        Self(key)
    }

    /// Verify `signature_hex` over `timestamp || body`
    pub fn verify(
        &self,
        timestamp: &[u8],
        body: &[u8],
        signature_hex: &[u8],
    ) -> Result<(), SignatureError> {
        let signature: [u8; 64] = hex::decode(signature_hex)
            .map_err(|_| SignatureError::Malformed)?
            .try_into()
            .map_err(|_| SignatureError::Malformed)?;
        let signature = Signature::from_bytes(&signature);

        let message = [timestamp, body].concat();

        self.0
            .verify_strict(&message, &signature)
            .map_err(|_| SignatureError::Invalid)
    }
}

/// An [`Interaction`] whose signature was checked against the [`InteractionKey`]
/// in the router's state.
#[derive(Debug, Clone)]
pub struct VerifiedInteraction(pub Interaction);

#[async_trait]
impl<S> FromRequest<S, Body> for VerifiedInteraction
where
    S: Send + Sync,
    InteractionKey: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let key = InteractionKey::from_ref(state);

        let timestamp = header(req.headers(), TIMESTAMP_HEADER)?;
        let signature = header(req.headers(), SIGNATURE_HEADER)?;

        // Bounded by the router's `DefaultBodyLimit`
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::new(rejection.status(), Some(rejection.body_text())))?;

        key.verify(&timestamp, &body, &signature).map_err(|err| {
            tracing::warn!(%err, "Rejecting interaction");
            err
        })?;

        Ok(Self(serde_json::from_slice(&body)?))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Result<Vec<u8>, SignatureError> {
    headers
        .get(name)
        .map(|value| value.as_bytes().to_vec())
        .ok_or(SignatureError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn sign(key: &SigningKey, timestamp: &str, body: &str) -> String {
        let message = [timestamp.as_bytes(), body.as_bytes()].concat();
        hex::encode(key.sign(&message).to_bytes())
    }

    #[test]
    fn test_verify_valid_signature() {
        let signing_key = signing_key();
        let key = InteractionKey::new(signing_key.verifying_key());
        let signature = sign(&signing_key, "1700000000", r#"{"type":1}"#);

        assert_matches!(
            key.verify(b"1700000000", br#"{"type":1}"#, signature.as_bytes()),
            Ok(())
        );
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signing_key = signing_key();
        let key = InteractionKey::new(signing_key.verifying_key());
        let signature = sign(&signing_key, "1700000000", r#"{"type":1}"#);

        assert_matches!(
            key.verify(b"1700000001", br#"{"type":1}"#, signature.as_bytes()),
            Err(SignatureError::Invalid)
        );
        assert_matches!(
            key.verify(b"1700000000", br#"{"type":2}"#, signature.as_bytes()),
            Err(SignatureError::Invalid)
        );
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        let key = InteractionKey::new(signing_key().verifying_key());

        assert_matches!(
            key.verify(b"1", b"{}", b"not hex"),
            Err(SignatureError::Malformed)
        );
        assert_matches!(
            key.verify(b"1", b"{}", b"abcd"),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn test_key_from_hex() -> testresult::TestResult {
        let signing_key = signing_key();
        let hex_key = hex::encode(signing_key.verifying_key().to_bytes());

        assert_eq!(
            InteractionKey::from_hex(&hex_key)?,
            InteractionKey::new(signing_key.verifying_key())
        );
        assert!(InteractionKey::from_hex("abcd").is_err());
        Ok(())
    }
}
