//! Self-describing client identifiers.
//!
//! Format: `WebCrypto-raw.EC.P-256$<base64url(SEC1 uncompressed point)>`
//!
//! The identifier carries the client's public key, so resolving it needs no
//! directory. The scheme prefix names the browser WebCrypto export format the
//! key bytes come from.

use crate::keys::{decode_base64_lenient, decode_public_key, encode_public_key};
use crate::{Error, PublicKey, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::fmt;
use std::str::FromStr;

/// Scheme for raw P-256 keys exported by WebCrypto.
pub const P256_RAW_SCHEME: &str = "WebCrypto-raw.EC.P-256";

/// Separator between the scheme and the encoded key.
pub const SCHEME_SEPARATOR: char = '$';

/// A parsed self-describing client identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId {
    public_key: PublicKey,
}

impl ClientId {
    /// Create the identifier for a public key.
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }

    /// Get the public key this identifier names.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the encoded key portion.
    pub fn key_id(&self) -> String {
        URL_SAFE_NO_PAD.encode(encode_public_key(&self.public_key))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", P256_RAW_SCHEME, SCHEME_SEPARATOR, self.key_id())
    }
}

impl FromStr for ClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, encoded) = s.split_once(SCHEME_SEPARATOR).ok_or_else(|| {
            Error::InvalidClientId(format!("missing '{SCHEME_SEPARATOR}' separator"))
        })?;

        if scheme != P256_RAW_SCHEME {
            return Err(Error::UnsupportedScheme(scheme.to_string()));
        }
        if encoded.is_empty() {
            return Err(Error::InvalidClientId("empty key".into()));
        }

        let bytes = decode_base64_lenient(encoded)?;
        let public_key = decode_public_key(&bytes)?;

        Ok(Self { public_key })
    }
}
