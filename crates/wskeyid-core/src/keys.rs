//! P-256 key management for client identities.

use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use p256::ecdsa::{Signature, SigningKey, signature::Signer};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

/// A P-256 public key, as resolved for a client identifier.
pub use p256::PublicKey;

/// Length in bytes of a raw `r || s` signature.
pub const SIGNATURE_LEN: usize = 64;

/// A client's private signing key.
///
/// Held by the peer proving its identity; the server side only ever sees the
/// matching [`PublicKey`].
#[derive(Debug, Clone)]
pub struct ClientKey {
    signing_key: SigningKey,
}

impl ClientKey {
    /// Generate a new random client key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create from an existing 32-byte big-endian secret scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Get the secret scalar bytes (be careful with this!).
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.signing_key.to_bytes());
        out
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.signing_key.verifying_key())
    }

    /// Sign a message, returning the raw 64-byte `r || s` signature over
    /// SHA-256(message).
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        let signature: Signature = self.signing_key.sign(message);
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&signature.to_bytes());
        out
    }
}

/// Encode a public key as an uncompressed SEC1 point (65 bytes).
pub fn encode_public_key(key: &PublicKey) -> Vec<u8> {
    key.to_encoded_point(false).as_bytes().to_vec()
}

/// Decode a SEC1 point (compressed or uncompressed) into a public key.
pub fn decode_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(bytes).map_err(|_| {
        Error::InvalidPublicKey(format!(
            "{} bytes do not encode a point on P-256",
            bytes.len()
        ))
    })
}

/// Decode base64 text, accepting URL-safe without padding first and the
/// standard padded alphabet second.
pub fn decode_base64_lenient(text: &str) -> Result<Vec<u8>> {
    match URL_SAFE_NO_PAD.decode(text) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(STANDARD.decode(text)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{VerifyingKey, signature::Verifier};

    #[test]
    fn test_sign_verify() {
        let key = ClientKey::generate();
        let message = b"hello world";
        let raw = key.sign(message);

        let signature = Signature::from_slice(&raw).unwrap();
        let verifying = VerifyingKey::from(&key.public_key());
        verifying.verify(message, &signature).unwrap();
    }

    #[test]
    fn test_secret_roundtrip() {
        let key = ClientKey::generate();
        let restored = ClientKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(matches!(
            ClientKey::from_bytes(&[0u8; 32]),
            Err(Error::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_public_key_encoding() {
        let key = ClientKey::generate().public_key();
        let encoded = encode_public_key(&key);
        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], 0x04);
        assert_eq!(decode_public_key(&encoded).unwrap(), key);
    }

    #[test]
    fn test_decode_garbage_point() {
        assert!(matches!(
            decode_public_key(&[0x04; 65]),
            Err(Error::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_lenient_base64() {
        assert_eq!(decode_base64_lenient("-_8").unwrap(), vec![0xfb, 0xff]);
        assert_eq!(decode_base64_lenient("+/8=").unwrap(), vec![0xfb, 0xff]);
        assert!(decode_base64_lenient("not base64!").is_err());
    }
}
