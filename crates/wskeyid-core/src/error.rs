//! Error types for wskeyid-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid client ID format: {0}")]
    InvalidClientId(String),

    #[error("Unsupported key scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Invalid base64 encoding: {0}")]
    Base64(#[from] base64::DecodeError),
}
