//! # wskeyid
//!
//! Key-identity authentication for WebSocket peers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wskeyid::{ClientId, ClientKey};
//!
//! // Generate an identity
//! let key = ClientKey::generate();
//! println!("client id: {}", ClientId::new(key.public_key()));
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Identity primitives (keys, client identifiers)
//! - [`handshake`] - Challenge-response protocol
//! - [`resolver`] - Directory of registered clients
//!
//! ## Re-exports
//!
//! Common types are re-exported at the crate root for convenience.

pub use wskeyid_core as core;
pub use wskeyid_handshake as handshake;
pub use wskeyid_resolver as resolver;

// Re-export common types at root
pub use wskeyid_core::{ClientId, ClientKey, PublicKey};
pub use wskeyid_handshake::{
    Authenticator, ErrorKind, FrameChannel, HandshakeError, HandshakePolicy, KeyResolver,
    MemoryChannel, SelfDescribingResolver,
};
pub use wskeyid_resolver::Directory;
