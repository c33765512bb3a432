//! Challenge-response key-identity handshake.
//!
//! Right after a framed connection opens, the server proves that the peer
//! holds the private key behind the identifier it presented, before any
//! application traffic flows.
//!
//! # Example
//!
//! ```no_run
//! use wskeyid_core::{ClientId, ClientKey};
//! use wskeyid_handshake::{Authenticator, MemoryChannel, SelfDescribingResolver};
//!
//! # async fn run() -> wskeyid_handshake::Result<()> {
//! let key = ClientKey::generate();
//! let client_id = ClientId::new(key.public_key()).to_string();
//!
//! let (mut server_end, _peer_end) = MemoryChannel::pair();
//! let auth = Authenticator::new(SelfDescribingResolver);
//! auth.authenticate(&mut server_end, &client_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod channel;
pub mod client;
pub mod codec;
pub mod error;
pub mod machine;
pub mod messages;
pub mod protocol;
pub mod resolver;
pub mod verify;

pub use challenge::{
    CHALLENGE_LEN, Challenge, ChallengeError, ChallengeGenerator, OsRandom, RandomSource,
};
pub use channel::{Frame, FrameChannel, MemoryChannel, TransportError};
pub use client::{respond_to_challenge, sign_payload};
pub use codec::CodecError;
pub use error::{ErrorKind, HandshakeError, Result};
pub use machine::{
    Event, HandshakePolicy, HandshakeState, InvalidTransition, Phase, StateMachine, Transition,
};
pub use messages::{
    ChallengeResponse, ClientMessage, Envelope, ErrorPayload, ServerChallenge, ServerMessage,
};
pub use protocol::{Authenticator, HandshakeOutcome};
pub use resolver::{InvalidClientIdentifier, KeyResolver, SelfDescribingResolver};
pub use verify::{EcdsaBackend, P256Backend, SignatureVerifier};
