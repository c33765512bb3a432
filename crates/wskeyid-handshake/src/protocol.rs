//! Handshake orchestration over a live connection.

use crate::challenge::{ChallengeGenerator, OsRandom, RandomSource};
use crate::channel::{Frame, FrameChannel};
use crate::codec;
use crate::error::{HandshakeError, Result};
use crate::machine::{Event, HandshakePolicy, HandshakeState, Phase, StateMachine};
use crate::messages::ServerMessage;
use crate::resolver::KeyResolver;
use crate::verify::{EcdsaBackend, P256Backend, SignatureVerifier};
use tracing::{debug, info, warn};

/// Final state and verdict of one handshake.
#[derive(Debug)]
pub struct HandshakeOutcome {
    /// State the handshake stopped in. Non-terminal only when the transport
    /// failed mid-way.
    pub phase: Phase,
    pub result: Result<()>,
}

/// Authenticates peers on freshly opened connections.
///
/// One `Authenticator` serves any number of concurrent handshakes; each call
/// owns its own challenge, key and state.
#[derive(Debug, Clone)]
pub struct Authenticator<R, S = OsRandom, B = P256Backend> {
    resolver: R,
    generator: ChallengeGenerator<S>,
    machine: StateMachine<B>,
}

impl<R: KeyResolver> Authenticator<R> {
    /// Authenticator with OS randomness, the `p256` verifier and the default
    /// policy.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            generator: ChallengeGenerator::default(),
            machine: StateMachine::default(),
        }
    }
}

impl<R: KeyResolver, S: RandomSource, B: EcdsaBackend> Authenticator<R, S, B> {
    pub fn with_parts(
        resolver: R,
        generator: ChallengeGenerator<S>,
        verifier: SignatureVerifier<B>,
        policy: HandshakePolicy,
    ) -> Self {
        Self {
            resolver,
            generator,
            machine: StateMachine::new(verifier, policy),
        }
    }

    pub fn with_policy(mut self, policy: HandshakePolicy) -> Self
    where
        B: Clone,
    {
        self.machine = StateMachine::new(self.machine.verifier().clone(), policy);
        self
    }

    /// Run the handshake for `client_id`; `Ok(())` means the peer proved it
    /// holds the key.
    pub async fn authenticate<C: FrameChannel>(
        &self,
        channel: &mut C,
        client_id: &str,
    ) -> Result<()> {
        self.run(channel, client_id).await.result
    }

    /// Run the handshake and report the state it ended in.
    #[tracing::instrument(skip_all, fields(client_id = %client_id))]
    pub async fn run<C: FrameChannel>(&self, channel: &mut C, client_id: &str) -> HandshakeOutcome {
        let mut state = HandshakeState::Start;
        let result = self.drive(channel, client_id, &mut state).await;
        let phase = state.phase();

        match &result {
            Ok(()) => info!("peer verified"),
            Err(err) => warn!(?phase, kind = ?err.kind(), error = %err, "handshake failed"),
        }
        HandshakeOutcome { phase, result }
    }

    async fn drive<C: FrameChannel>(
        &self,
        channel: &mut C,
        client_id: &str,
        state: &mut HandshakeState,
    ) -> Result<()> {
        let resolved = self.resolver.resolve(client_id);
        if let Some(outcome) = self
            .step(channel, state, Event::KeyResolved(resolved))
            .await?
        {
            return outcome;
        }

        let challenge = self.generator.generate();
        if let Some(outcome) = self
            .step(channel, state, Event::ChallengeIssued(challenge))
            .await?
        {
            return outcome;
        }
        debug!("challenge issued");

        loop {
            let frame = channel.recv().await?;
            if let Some(outcome) = self.step(channel, state, Event::Frame(frame)).await? {
                return outcome;
            }
        }
    }

    /// Apply one event, send what it produced, and hand back the verdict if
    /// the handshake is over. The outer `Result` is a transport or encoding
    /// failure while sending.
    async fn step<C: FrameChannel>(
        &self,
        channel: &mut C,
        state: &mut HandshakeState,
        event: Event,
    ) -> Result<Option<Result<()>>> {
        let current = std::mem::replace(state, HandshakeState::Start);
        let transition = match self.machine.transition(current, event) {
            Ok(transition) => transition,
            Err(invalid) => {
                let err = HandshakeError::from(&invalid);
                *state = invalid.state;
                return Err(err);
            }
        };
        *state = transition.state;

        for message in &transition.outbound {
            if let ServerMessage::ClientError(payload) = message
                && transition.outcome.is_none()
            {
                warn!(title = %payload.title, "response rejected, awaiting another");
            }
            send(channel, message).await?;
        }
        Ok(transition.outcome)
    }
}

async fn send<C: FrameChannel>(channel: &mut C, message: &ServerMessage) -> Result<()> {
    let text = codec::encode_server(message)?;
    channel.send(Frame::Text(text)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, TransportError};
    use crate::client::respond_to_challenge;
    use crate::resolver::SelfDescribingResolver;
    use wskeyid_core::{ClientId, ClientKey};

    async fn next_message(peer: &mut MemoryChannel) -> ServerMessage {
        let frame = peer.recv().await.unwrap();
        codec::decode_server(frame.data().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_full_handshake() {
        let key = ClientKey::generate();
        let id = ClientId::new(key.public_key()).to_string();
        let (mut server, mut peer) = MemoryChannel::pair();

        let client = tokio::spawn(async move {
            let ServerMessage::ServerChallenge(challenge) = next_message(&mut peer).await else {
                panic!("expected a challenge");
            };
            let reply = respond_to_challenge(&key, &challenge).unwrap();
            peer.send_text(codec::encode_client(&reply).unwrap())
                .await
                .unwrap();
            next_message(&mut peer).await
        });

        let auth = Authenticator::new(SelfDescribingResolver);
        let outcome = auth.run(&mut server, &id).await;
        assert_eq!(outcome.phase, Phase::Verified);
        assert!(outcome.result.is_ok());
        assert!(matches!(
            client.await.unwrap(),
            ServerMessage::Authorized(_)
        ));
    }

    #[tokio::test]
    async fn test_out_of_order_event_keeps_state() {
        let (mut server, _peer) = MemoryChannel::pair();
        let auth = Authenticator::new(SelfDescribingResolver);
        let mut state = HandshakeState::Verified;

        let err = auth
            .step(&mut server, &mut state, Event::Frame(Frame::Text("{}".into())))
            .await
            .unwrap_err();

        assert_eq!(state, HandshakeState::Verified);
        assert!(matches!(
            err,
            HandshakeError::InvalidTransition {
                phase: Phase::Verified,
                event: "Frame"
            }
        ));
    }

    #[tokio::test]
    async fn test_peer_disconnect_is_transport_error() {
        let key = ClientKey::generate();
        let id = ClientId::new(key.public_key()).to_string();
        let (mut server, mut peer) = MemoryChannel::pair();

        let client = tokio::spawn(async move {
            let _challenge = next_message(&mut peer).await;
            drop(peer);
        });

        let auth = Authenticator::new(SelfDescribingResolver);
        let outcome = auth.run(&mut server, &id).await;
        client.await.unwrap();

        assert_eq!(outcome.phase, Phase::ChallengeSent);
        assert!(matches!(
            outcome.result,
            Err(HandshakeError::Transport(TransportError::Closed))
        ));
    }
}
