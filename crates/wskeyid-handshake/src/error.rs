//! Error types for the handshake.

use crate::challenge::ChallengeError;
use crate::channel::TransportError;
use crate::codec::CodecError;
use crate::machine::Phase;
use crate::resolver::InvalidClientIdentifier;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error(transparent)]
    InvalidClientIdentifier(#[from] InvalidClientIdentifier),

    #[error("Challenge generation failed: {0}")]
    Challenge(#[from] ChallengeError),

    #[error("Signature does not match")]
    SignatureMismatch,

    #[error("Echoed payload does not match the issued challenge")]
    ChallengeMismatch,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to encode outbound message: {0}")]
    Encode(#[from] CodecError),

    #[error("Event {event} is not valid in state {phase:?}")]
    InvalidTransition { phase: Phase, event: &'static str },
}

/// Who or what a handshake failure is attributable to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolvable client identifier.
    Identity,
    /// Local resource failure; not the peer's fault.
    Environment,
    /// The peer failed to prove possession of the key.
    Protocol,
    /// The connection itself failed.
    Transport,
}

impl HandshakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidClientIdentifier(_) => ErrorKind::Identity,
            Self::Challenge(_) | Self::Encode(_) | Self::InvalidTransition { .. } => {
                ErrorKind::Environment
            }
            Self::SignatureMismatch | Self::ChallengeMismatch => ErrorKind::Protocol,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

pub type Result<T> = std::result::Result<T, HandshakeError>;
