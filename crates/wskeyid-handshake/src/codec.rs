//! Envelope encoding and decoding.
//!
//! Decoding is two-step: bytes to [`Envelope`], then the envelope's `data`
//! into a typed payload. The split keeps "not JSON at all" apart from "JSON,
//! but the wrong message".

use crate::messages::{
    ChallengeResponse, ClientMessage, Envelope, ServerMessage, SignedPayload, types,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("unexpected message type: expected {expected}, got {got:?}")]
    UnexpectedMessageType { expected: String, got: String },

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CodecError {
    fn malformed(reason: impl ToString) -> Self {
        Self::MalformedMessage {
            reason: reason.to_string(),
        }
    }

    /// Structured form for error metadata sent back to the peer.
    pub fn to_meta(&self) -> Value {
        match self {
            Self::MalformedMessage { reason } => {
                json!({"kind": "MALFORMED_MESSAGE", "reason": reason})
            }
            Self::UnexpectedMessageType { expected, got } => {
                json!({"kind": "UNEXPECTED_MESSAGE_TYPE", "expected": expected, "got": got})
            }
            Self::Encode(e) => json!({"kind": "ENCODE", "reason": e.to_string()}),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Decode raw frame bytes into an envelope.
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    serde_json::from_slice(bytes).map_err(CodecError::malformed)
}

/// Check the envelope discriminant and hand back its data.
pub fn expect_type(envelope: Envelope, want: &str) -> Result<Value> {
    if envelope.kind != want {
        return Err(CodecError::UnexpectedMessageType {
            expected: want.to_string(),
            got: envelope.kind,
        });
    }
    Ok(envelope.data)
}

/// Decode an envelope's data into a typed payload.
pub fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(CodecError::malformed)
}

/// Decode a `CHALLENGE_RESPONSE` frame, base64-decoding both fields.
///
/// Both `payload` and `signature` must be present. A response missing either
/// is malformed, so the handshake answers it and keeps waiting; present but
/// empty fields decode fine and then fail verification, which is terminal.
pub fn decode_challenge_response(bytes: &[u8]) -> Result<SignedPayload> {
    let data = expect_type(decode(bytes)?, types::CHALLENGE_RESPONSE)?;
    let response: ChallengeResponse = decode_data(data)?;

    let payload = STANDARD
        .decode(&response.payload)
        .map_err(|e| CodecError::malformed(format!("payload: {e}")))?;
    let signature = STANDARD
        .decode(&response.signature)
        .map_err(|e| CodecError::malformed(format!("signature: {e}")))?;

    Ok(SignedPayload { payload, signature })
}

/// Encode a server message as JSON text.
pub fn encode_server(message: &ServerMessage) -> Result<String> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

/// Encode a client message as JSON text.
pub fn encode_client(message: &ClientMessage) -> Result<String> {
    serde_json::to_string(message).map_err(CodecError::Encode)
}

/// Decode a server message (client side).
pub fn decode_server(bytes: &[u8]) -> Result<ServerMessage> {
    serde_json::from_slice(bytes).map_err(CodecError::malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ErrorPayload, ServerChallenge};

    fn frame(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_decode_challenge_response() {
        let bytes = frame(json!({
            "type": "CHALLENGE_RESPONSE",
            "data": {"payload": "AQID", "signature": "BAUG"}
        }));
        let signed = decode_challenge_response(&bytes).unwrap();
        assert_eq!(signed.payload, vec![1, 2, 3]);
        assert_eq!(signed.signature, vec![4, 5, 6]);
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = decode_challenge_response(b"hello there").unwrap_err();
        assert!(matches!(err, CodecError::MalformedMessage { .. }));
    }

    #[test]
    fn test_wrong_type_is_unexpected() {
        let bytes = frame(json!({"type": "RESPONSE", "data": "hi"}));
        let err = decode_challenge_response(&bytes).unwrap_err();
        match err {
            CodecError::UnexpectedMessageType { expected, got } => {
                assert_eq!(expected, "CHALLENGE_RESPONSE");
                assert_eq!(got, "RESPONSE");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_type_is_unexpected() {
        let bytes = frame(json!({"data": {"payload": "", "signature": ""}}));
        assert!(matches!(
            decode_challenge_response(&bytes),
            Err(CodecError::UnexpectedMessageType { .. })
        ));
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let bytes = frame(json!({"type": "CHALLENGE_RESPONSE"}));
        assert!(matches!(
            decode_challenge_response(&bytes),
            Err(CodecError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_missing_signature_field_is_malformed() {
        let bytes = frame(json!({"type": "CHALLENGE_RESPONSE", "data": {"payload": "AQID"}}));
        assert!(matches!(
            decode_challenge_response(&bytes),
            Err(CodecError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_bad_base64_is_malformed() {
        let bytes = frame(json!({
            "type": "CHALLENGE_RESPONSE",
            "data": {"payload": "AQID", "signature": "***"}
        }));
        match decode_challenge_response(&bytes).unwrap_err() {
            CodecError::MalformedMessage { reason } => assert!(reason.starts_with("signature")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_server_message_decodes_on_client() {
        let text = encode_server(&ServerMessage::ServerChallenge(ServerChallenge {
            payload: "AAAA".into(),
        }))
        .unwrap();
        let decoded = decode_server(text.as_bytes()).unwrap();
        assert_eq!(
            decoded,
            ServerMessage::ServerChallenge(ServerChallenge {
                payload: "AAAA".into()
            })
        );

        let text = encode_server(&ServerMessage::ClientError(
            ErrorPayload::new("t", "d").with_meta("k", 1),
        ))
        .unwrap();
        assert!(matches!(
            decode_server(text.as_bytes()).unwrap(),
            ServerMessage::ClientError(p) if p.meta["k"] == 1
        ));
    }

    #[test]
    fn test_error_meta_carries_kind() {
        let err = CodecError::UnexpectedMessageType {
            expected: "A".into(),
            got: "B".into(),
        };
        assert_eq!(err.to_meta()["kind"], "UNEXPECTED_MESSAGE_TYPE");
        assert_eq!(err.to_meta()["got"], "B");
    }
}
