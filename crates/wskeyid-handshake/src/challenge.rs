//! Challenge generation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Raw challenge length in bytes.
pub const CHALLENGE_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("insufficient entropy: random source produced {produced} of {required} bytes")]
    InsufficientEntropy { produced: usize, required: usize },

    #[error("random source failed: {0}")]
    Source(String),
}

/// Source of cryptographically secure random bytes.
///
/// Shared by every concurrent handshake, so implementations must tolerate
/// concurrent calls.
pub trait RandomSource: Send + Sync {
    /// Fill `buf`, returning how many bytes were actually written.
    fn fill(&self, buf: &mut [u8]) -> Result<usize, ChallengeError>;
}

/// Operating system randomness via `getrandom`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<usize, ChallengeError> {
        getrandom::fill(buf).map_err(|e| ChallengeError::Source(e.to_string()))?;
        Ok(buf.len())
    }
}

/// A freshly issued challenge. Never reused across handshakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    raw: Vec<u8>,
    encoded: String,
}

impl Challenge {
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Base64 (standard, padded) transport form.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// Produces one challenge per handshake attempt.
#[derive(Debug, Clone, Default)]
pub struct ChallengeGenerator<S = OsRandom> {
    source: S,
}

impl<S: RandomSource> ChallengeGenerator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Draw [`CHALLENGE_LEN`] random bytes. A short read is an error, never
    /// retried.
    pub fn generate(&self) -> Result<Challenge, ChallengeError> {
        let mut raw = vec![0u8; CHALLENGE_LEN];
        let produced = self.source.fill(&mut raw)?;
        if produced < CHALLENGE_LEN {
            return Err(ChallengeError::InsufficientEntropy {
                produced,
                required: CHALLENGE_LEN,
            });
        }
        let encoded = STANDARD.encode(&raw);
        Ok(Challenge { raw, encoded })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct ShortRead(usize);

    impl RandomSource for ShortRead {
        fn fill(&self, buf: &mut [u8]) -> Result<usize, ChallengeError> {
            Ok(self.0.min(buf.len()))
        }
    }

    #[test]
    fn test_challenge_length() {
        let challenge = ChallengeGenerator::<OsRandom>::default().generate().unwrap();
        assert_eq!(challenge.raw().len(), CHALLENGE_LEN);

        let decoded = STANDARD.decode(challenge.encoded()).unwrap();
        assert_eq!(decoded, challenge.raw());
    }

    #[test]
    fn test_challenges_are_fresh() {
        let generator: ChallengeGenerator = ChallengeGenerator::default();
        let seen: HashSet<Vec<u8>> = (0..256)
            .map(|_| generator.generate().unwrap().raw().to_vec())
            .collect();
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn test_short_read_is_insufficient_entropy() {
        let err = ChallengeGenerator::new(ShortRead(127)).generate().unwrap_err();
        assert!(matches!(
            err,
            ChallengeError::InsufficientEntropy {
                produced: 127,
                required: 128
            }
        ));
    }

    #[test]
    fn test_source_failure_propagates() {
        struct Broken;
        impl RandomSource for Broken {
            fn fill(&self, _buf: &mut [u8]) -> Result<usize, ChallengeError> {
                Err(ChallengeError::Source("device gone".into()))
            }
        }
        assert!(matches!(
            ChallengeGenerator::new(Broken).generate(),
            Err(ChallengeError::Source(_))
        ));
    }
}
