//! Client identifier resolution port.

use std::sync::Arc;
use thiserror::Error;
use wskeyid_core::{ClientId, PublicKey};

/// The identifier could not be turned into a public key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid client identifier {identifier:?}: {reason}")]
pub struct InvalidClientIdentifier {
    pub identifier: String,
    pub reason: String,
}

impl InvalidClientIdentifier {
    pub fn new(identifier: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }
}

/// Maps a client-supplied identifier to its public key.
///
/// Called once per handshake, possibly from many handshakes at once.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, identifier: &str) -> Result<PublicKey, InvalidClientIdentifier>;
}

impl<R: KeyResolver + ?Sized> KeyResolver for Arc<R> {
    fn resolve(&self, identifier: &str) -> Result<PublicKey, InvalidClientIdentifier> {
        (**self).resolve(identifier)
    }
}

impl<R: KeyResolver + ?Sized> KeyResolver for &R {
    fn resolve(&self, identifier: &str) -> Result<PublicKey, InvalidClientIdentifier> {
        (**self).resolve(identifier)
    }
}

/// Resolves identifiers that embed their own key (see [`ClientId`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfDescribingResolver;

impl KeyResolver for SelfDescribingResolver {
    fn resolve(&self, identifier: &str) -> Result<PublicKey, InvalidClientIdentifier> {
        identifier
            .parse::<ClientId>()
            .map(|id| *id.public_key())
            .map_err(|e| InvalidClientIdentifier::new(identifier, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wskeyid_core::ClientKey;

    #[test]
    fn test_resolves_embedded_key() {
        let key = ClientKey::generate().public_key();
        let id = ClientId::new(key).to_string();
        assert_eq!(SelfDescribingResolver.resolve(&id).unwrap(), key);
    }

    #[test]
    fn test_failure_carries_identifier() {
        let err = SelfDescribingResolver.resolve("abc").unwrap_err();
        assert_eq!(err.identifier, "abc");
        assert!(err.reason.contains("separator"));
    }

    #[test]
    fn test_shared_resolver() {
        let key = ClientKey::generate().public_key();
        let shared: Arc<dyn KeyResolver> = Arc::new(SelfDescribingResolver);
        let id = ClientId::new(key).to_string();
        assert_eq!(shared.resolve(&id).unwrap(), key);
    }
}
