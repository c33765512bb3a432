//! ECDSA P-256 signature verification over SHA-256.
//!
//! Signatures are raw `r || s`: the first 32 bytes are `r`, everything after
//! is `s`, both unsigned big-endian. Invalid signatures yield `false`, never an
//! error.
//!
//! Verification is not constant time.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256};
use wskeyid_core::PublicKey;

/// Minimum signature length accepted before any curve arithmetic.
pub const MIN_SIGNATURE_LEN: usize = 64;

const SCALAR_LEN: usize = 32;

/// The curve computation behind [`SignatureVerifier`].
pub trait EcdsaBackend: Send + Sync {
    /// Check the ECDSA equation for `(r, s)` over a SHA-256 digest.
    fn verify_digest(&self, key: &PublicKey, digest: &[u8; 32], r: &[u8], s: &[u8]) -> bool;
}

/// RustCrypto `p256` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct P256Backend;

impl EcdsaBackend for P256Backend {
    fn verify_digest(&self, key: &PublicKey, digest: &[u8; 32], r: &[u8], s: &[u8]) -> bool {
        let (Some(r), Some(s)) = (scalar_bytes(r), scalar_bytes(s)) else {
            return false;
        };
        let mut raw = [0u8; 2 * SCALAR_LEN];
        raw[..SCALAR_LEN].copy_from_slice(&r);
        raw[SCALAR_LEN..].copy_from_slice(&s);

        // Rejects zero and out-of-range scalars.
        let Ok(signature) = Signature::from_slice(&raw) else {
            return false;
        };
        VerifyingKey::from(key)
            .verify_prehash(digest, &signature)
            .is_ok()
    }
}

/// Left-pad a big-endian integer to 32 bytes, or `None` if it does not fit.
fn scalar_bytes(be: &[u8]) -> Option<[u8; SCALAR_LEN]> {
    let start = be.iter().position(|&b| b != 0).unwrap_or(be.len());
    let significant = &be[start..];
    if significant.len() > SCALAR_LEN {
        return None;
    }
    let mut out = [0u8; SCALAR_LEN];
    out[SCALAR_LEN - significant.len()..].copy_from_slice(significant);
    Some(out)
}

/// Verifies challenge signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier<B = P256Backend> {
    backend: B,
}

impl<B: EcdsaBackend> SignatureVerifier<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Verify `signature` over SHA-256(`plaintext`) against `key`.
    pub fn verify(&self, key: &PublicKey, plaintext: &[u8], signature: &[u8]) -> bool {
        if signature.len() < MIN_SIGNATURE_LEN {
            return false;
        }
        let (r, s) = signature.split_at(SCALAR_LEN);
        let digest: [u8; 32] = Sha256::digest(plaintext).into();
        self.backend.verify_digest(key, &digest, r, s)
    }
}
