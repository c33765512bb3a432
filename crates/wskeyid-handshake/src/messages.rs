//! Handshake protocol message types.
//!
//! Every message on the wire is an envelope `{"type": ..., "data": ...}`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope discriminants.
pub mod types {
    pub const SERVER_CHALLENGE: &str = "SERVER_CHALLENGE";
    pub const CLIENT_ERROR: &str = "CLIENT_ERROR";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const AUTHORIZED: &str = "AUTHORIZED";
    pub const CHALLENGE_RESPONSE: &str = "CHALLENGE_RESPONSE";
}

/// Untyped envelope as decoded off the wire.
///
/// Both fields default so that a missing discriminant surfaces as an
/// unexpected type rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Messages the server sends to the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    ServerChallenge(ServerChallenge),
    ClientError(ErrorPayload),
    ServerError(ErrorPayload),
    Authorized(Authorized),
}

impl ServerMessage {
    /// The envelope discriminant of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerChallenge(_) => types::SERVER_CHALLENGE,
            Self::ClientError(_) => types::CLIENT_ERROR,
            Self::ServerError(_) => types::SERVER_ERROR,
            Self::Authorized(_) => types::AUTHORIZED,
        }
    }
}

/// Messages the peer sends to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    ChallengeResponse(ChallengeResponse),
}

/// Challenge payload, base64 of the raw challenge bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerChallenge {
    pub payload: String,
}

/// Authorization notice. Carries no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorized {}

/// Error details attached to `CLIENT_ERROR` and `SERVER_ERROR` envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub title: String,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ErrorPayload {
    pub fn new(title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: detail.into(),
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Wire form of a challenge response: both fields base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub payload: String,
    pub signature: String,
}

impl ChallengeResponse {
    /// Build from raw bytes.
    pub fn from_raw(payload: &[u8], signature: &[u8]) -> Self {
        Self {
            payload: STANDARD.encode(payload),
            signature: STANDARD.encode(signature),
        }
    }
}

/// A challenge response with both fields base64-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Error titles sent to the peer.
pub mod titles {
    pub const BAD_CLIENT_ID: &str = "Bad client ID was supplied";
    pub const CHALLENGE_GENERATION: &str = "Error generating challenge payload";
    pub const NOT_A_CHALLENGE_RESPONSE: &str = "Not a challenge response";
    pub const SIGNATURE_VERIFICATION: &str = "Signature verification failed";
    pub const CHALLENGE_MISMATCH: &str = "Challenge payload mismatch";
}
