//! Handshake state machine.
//!
//! ```text
//!   Start ──KeyResolved(ok)──► Resolved ──ChallengeIssued(ok)──► ChallengeSent ─┐
//!     │                           │                                │  ▲         │
//!     │ KeyResolved(err)          │ ChallengeIssued(err)           │  └─────────┘
//!     ▼                           ▼                                │  malformed / control frame
//!   Rejected                    Error                              ├──signature ok──► Verified
//!                                                                  └──signature bad─► Rejected
//! ```
//!
//! [`StateMachine::transition`] is pure: it takes the current state and one
//! event and returns the next state, the messages to send, and the verdict
//! once the state is terminal. All I/O lives in
//! [`Authenticator`](crate::protocol::Authenticator).

use crate::challenge::{Challenge, ChallengeError};
use crate::channel::Frame;
use crate::codec::{self, CodecError};
use crate::error::HandshakeError;
use crate::messages::{Authorized, ErrorPayload, ServerChallenge, ServerMessage, titles};
use crate::resolver::InvalidClientIdentifier;
use crate::verify::{EcdsaBackend, P256Backend, SignatureVerifier};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use wskeyid_core::PublicKey;

/// Full handshake state, including what each step has learned so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeState {
    /// Nothing done yet.
    Start,
    /// Key resolved; challenge not yet issued.
    Resolved { key: PublicKey },
    /// Challenge on the wire; waiting for a response.
    ChallengeSent { key: PublicKey, challenge: Challenge },
    Verified,
    Rejected,
    Error,
}

impl HandshakeState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Start => Phase::Start,
            Self::Resolved { .. } => Phase::Resolved,
            Self::ChallengeSent { .. } => Phase::ChallengeSent,
            Self::Verified => Phase::Verified,
            Self::Rejected => Phase::Rejected,
            Self::Error => Phase::Error,
        }
    }
}

/// Tag of a [`HandshakeState`] without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Resolved,
    ChallengeSent,
    Verified,
    Rejected,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected | Self::Error)
    }
}

/// Inputs that drive the machine.
#[derive(Debug)]
pub enum Event {
    /// Result of resolving the client identifier.
    KeyResolved(Result<PublicKey, InvalidClientIdentifier>),
    /// Result of generating the challenge.
    ChallengeIssued(Result<Challenge, ChallengeError>),
    /// An inbound frame.
    Frame(Frame),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::KeyResolved(_) => "KeyResolved",
            Self::ChallengeIssued(_) => "ChallengeIssued",
            Self::Frame(_) => "Frame",
        }
    }
}

/// Output of one step.
#[derive(Debug)]
pub struct Transition {
    pub state: HandshakeState,
    /// Messages to send, in order, before acting on `outcome`.
    pub outbound: Vec<ServerMessage>,
    /// Set exactly when `state` is terminal.
    pub outcome: Option<Result<(), HandshakeError>>,
}

impl Transition {
    fn stay(state: HandshakeState, outbound: Vec<ServerMessage>) -> Self {
        Self {
            state,
            outbound,
            outcome: None,
        }
    }

    fn finish(
        state: HandshakeState,
        message: ServerMessage,
        outcome: Result<(), HandshakeError>,
    ) -> Self {
        Self {
            state,
            outbound: vec![message],
            outcome: Some(outcome),
        }
    }
}

/// An event arrived that the current state cannot accept.
#[derive(Debug)]
pub struct InvalidTransition {
    /// The state the machine was in, returned untouched.
    pub state: HandshakeState,
    pub event: &'static str,
}

impl From<&InvalidTransition> for HandshakeError {
    fn from(invalid: &InvalidTransition) -> Self {
        HandshakeError::InvalidTransition {
            phase: invalid.state.phase(),
            event: invalid.event,
        }
    }
}

/// Caller-supplied handshake settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakePolicy {
    /// Reject responses whose payload is not the issued challenge before
    /// checking the signature. Off by default: without it, a valid signature
    /// over any payload is accepted.
    pub require_echoed_challenge: bool,
}

/// The transition function plus the fixed inputs it needs.
#[derive(Debug, Clone, Default)]
pub struct StateMachine<B = P256Backend> {
    verifier: SignatureVerifier<B>,
    policy: HandshakePolicy,
}

impl<B: EcdsaBackend> StateMachine<B> {
    pub fn new(verifier: SignatureVerifier<B>, policy: HandshakePolicy) -> Self {
        Self { verifier, policy }
    }

    pub fn policy(&self) -> HandshakePolicy {
        self.policy
    }

    pub fn verifier(&self) -> &SignatureVerifier<B> {
        &self.verifier
    }

    /// Advance `state` by one `event`.
    ///
    /// # Errors
    /// [`InvalidTransition`], carrying `state` back unchanged, if the event
    /// cannot occur in the current state. The handshake outcome itself is in
    /// [`Transition::outcome`].
    pub fn transition(
        &self,
        state: HandshakeState,
        event: Event,
    ) -> Result<Transition, InvalidTransition> {
        let transition = match (state, event) {
            (HandshakeState::Start, Event::KeyResolved(Ok(key))) => {
                Transition::stay(HandshakeState::Resolved { key }, Vec::new())
            }
            (HandshakeState::Start, Event::KeyResolved(Err(err))) => {
                let payload = ErrorPayload::new(titles::BAD_CLIENT_ID, err.reason.clone())
                    .with_meta("client_id", err.identifier.clone());
                Transition::finish(
                    HandshakeState::Rejected,
                    ServerMessage::ClientError(payload),
                    Err(err.into()),
                )
            }
            (HandshakeState::Resolved { key }, Event::ChallengeIssued(Ok(challenge))) => {
                let message = ServerMessage::ServerChallenge(ServerChallenge {
                    payload: challenge.encoded().to_string(),
                });
                Transition::stay(
                    HandshakeState::ChallengeSent { key, challenge },
                    vec![message],
                )
            }
            (HandshakeState::Resolved { .. }, Event::ChallengeIssued(Err(err))) => {
                let payload = ErrorPayload::new(titles::CHALLENGE_GENERATION, err.to_string());
                Transition::finish(
                    HandshakeState::Error,
                    ServerMessage::ServerError(payload),
                    Err(err.into()),
                )
            }
            (HandshakeState::ChallengeSent { key, challenge }, Event::Frame(frame)) => {
                self.on_frame(key, challenge, &frame)
            }
            (state, event) => {
                return Err(InvalidTransition {
                    state,
                    event: event.name(),
                });
            }
        };
        debug_assert_eq!(
            transition.outcome.is_some(),
            transition.state.phase().is_terminal()
        );
        Ok(transition)
    }

    fn on_frame(&self, key: PublicKey, challenge: Challenge, frame: &Frame) -> Transition {
        let Some(bytes) = frame.data() else {
            return Transition::stay(HandshakeState::ChallengeSent { key, challenge }, Vec::new());
        };

        let signed = match codec::decode_challenge_response(bytes) {
            Ok(signed) => signed,
            Err(err) => {
                return Transition::stay(
                    HandshakeState::ChallengeSent { key, challenge },
                    vec![ServerMessage::ClientError(not_a_challenge_response(&err))],
                );
            }
        };

        let meta_payload = STANDARD.encode(&signed.payload);
        let meta_signature = STANDARD.encode(&signed.signature);

        if self.policy.require_echoed_challenge && signed.payload != challenge.raw() {
            let payload = ErrorPayload::new(
                titles::CHALLENGE_MISMATCH,
                "The payload is not the challenge that was issued",
            )
            .with_meta("payload", meta_payload);
            return Transition::finish(
                HandshakeState::Rejected,
                ServerMessage::ClientError(payload),
                Err(HandshakeError::ChallengeMismatch),
            );
        }

        if !self
            .verifier
            .verify(&key, &signed.payload, &signed.signature)
        {
            let payload = ErrorPayload::new(
                titles::SIGNATURE_VERIFICATION,
                "The signature failed to verify",
            )
            .with_meta("payload", meta_payload)
            .with_meta("signature", meta_signature);
            return Transition::finish(
                HandshakeState::Rejected,
                ServerMessage::ClientError(payload),
                Err(HandshakeError::SignatureMismatch),
            );
        }

        Transition::finish(
            HandshakeState::Verified,
            ServerMessage::Authorized(Authorized::default()),
            Ok(()),
        )
    }
}

fn not_a_challenge_response(err: &CodecError) -> ErrorPayload {
    ErrorPayload::new(
        titles::NOT_A_CHALLENGE_RESPONSE,
        "Expected a challenge response but got something else that the JSON parser was not able to parse",
    )
    .with_meta("error_message", err.to_string())
    .with_meta("error", err.to_meta())
}
