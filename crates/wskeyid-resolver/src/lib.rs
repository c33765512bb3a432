//! Directory resolver for WebSocket key-identity authentication.
//!
//! Maps opaque client identifiers to P-256 public keys registered ahead of
//! time, as opposed to identifiers that carry their own key.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;
use wskeyid_core::client_id::SCHEME_SEPARATOR;
use wskeyid_core::keys::{decode_base64_lenient, decode_public_key};
use wskeyid_core::{ClientId, Error as CoreError, PublicKey};
use wskeyid_handshake::{InvalidClientIdentifier, KeyResolver};

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("client not found: {0}")]
    NotFound(String),

    #[error("invalid key for {id}: {source}")]
    InvalidKey {
        id: String,
        #[source]
        source: CoreError,
    },

    #[error("invalid directory file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResolverError>;

/// A directory of known clients and their public keys.
#[derive(Debug, Default)]
pub struct Directory {
    keys: RwLock<HashMap<String, PublicKey>>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client from its encoded key.
    ///
    /// The key is either a self-describing [`ClientId`] or the base64 SEC1
    /// encoding of a P-256 point. Anything else is rejected.
    pub fn register(&self, id: impl Into<String>, encoded_key: &str) -> Result<()> {
        let id = id.into();
        let key = parse_key(encoded_key.trim()).map_err(|source| ResolverError::InvalidKey {
            id: id.clone(),
            source,
        })?;
        self.register_key(id, key);
        Ok(())
    }

    /// Register an already decoded key, replacing any previous entry.
    pub fn register_key(&self, id: impl Into<String>, key: PublicKey) {
        let id = id.into();
        debug!(%id, "client registered");
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, key);
    }

    /// Look up the key registered for `id`.
    pub fn resolve(&self, id: &str) -> Result<PublicKey> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .ok_or_else(|| ResolverError::NotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ResolverError::NotFound(id.to_string()))
    }

    /// Registered identifiers, sorted.
    pub fn list(&self) -> Vec<String> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = keys.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a directory from `{"<id>": "<encoded key>", ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, String> = serde_json::from_str(json)?;
        let directory = Self::new();
        for (id, key) in entries {
            directory.register(id, &key)?;
        }
        Ok(directory)
    }

    /// Read a directory file written in the [`from_json`](Self::from_json)
    /// format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize back to the directory file format, keys as self-describing
    /// identifiers.
    pub fn to_json(&self) -> Result<String> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let entries: BTreeMap<&str, String> = keys
            .iter()
            .map(|(id, key)| (id.as_str(), ClientId::new(*key).to_string()))
            .collect();
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}

impl KeyResolver for Directory {
    fn resolve(&self, identifier: &str) -> std::result::Result<PublicKey, InvalidClientIdentifier> {
        Directory::resolve(self, identifier)
            .map_err(|e| InvalidClientIdentifier::new(identifier, e))
    }
}

fn parse_key(encoded: &str) -> std::result::Result<PublicKey, CoreError> {
    if encoded.contains(SCHEME_SEPARATOR) {
        return encoded.parse::<ClientId>().map(|id| *id.public_key());
    }
    decode_public_key(&decode_base64_lenient(encoded)?)
}
