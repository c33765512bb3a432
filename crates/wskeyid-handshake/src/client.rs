//! Peer side of the handshake: answering a challenge.

use crate::codec::CodecError;
use crate::messages::{ChallengeResponse, ClientMessage, ServerChallenge};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use wskeyid_core::ClientKey;

/// Sign raw payload bytes into a challenge response.
pub fn sign_payload(key: &ClientKey, payload: &[u8]) -> ChallengeResponse {
    ChallengeResponse::from_raw(payload, &key.sign(payload))
}

/// Answer a `SERVER_CHALLENGE` by signing its decoded payload.
///
/// # Errors
/// `CodecError::MalformedMessage` if the challenge payload is not base64.
pub fn respond_to_challenge(
    key: &ClientKey,
    challenge: &ServerChallenge,
) -> Result<ClientMessage, CodecError> {
    let payload = STANDARD
        .decode(&challenge.payload)
        .map_err(|e| CodecError::MalformedMessage {
            reason: format!("challenge payload: {e}"),
        })?;
    Ok(ClientMessage::ChallengeResponse(sign_payload(key, &payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::SignatureVerifier;

    #[test]
    fn test_response_verifies() {
        let key = ClientKey::generate();
        let challenge = ServerChallenge {
            payload: STANDARD.encode([9u8; 128]),
        };
        let ClientMessage::ChallengeResponse(response) =
            respond_to_challenge(&key, &challenge).unwrap();

        let payload = STANDARD.decode(&response.payload).unwrap();
        let signature = STANDARD.decode(&response.signature).unwrap();
        assert_eq!(payload, [9u8; 128]);
        assert_eq!(signature.len(), 64);
        let verifier: SignatureVerifier = SignatureVerifier::default();
        assert!(verifier.verify(&key.public_key(), &payload, &signature));
    }

    #[test]
    fn test_bad_challenge_encoding() {
        let key = ClientKey::generate();
        let challenge = ServerChallenge {
            payload: "%%%".into(),
        };
        assert!(matches!(
            respond_to_challenge(&key, &challenge),
            Err(CodecError::MalformedMessage { .. })
        ));
    }
}
