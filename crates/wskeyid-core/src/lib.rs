//! # wskeyid-core
//!
//! Identity primitives for WebSocket key-identity authentication.
//!
//! This crate provides:
//! - P-256 client key generation, import and export
//! - SEC1 public key encoding and decoding
//! - The self-describing client identifier format

pub mod client_id;
pub mod error;
pub mod keys;

pub use client_id::ClientId;
pub use error::Error;
pub use keys::{ClientKey, PublicKey};

/// Result type for wskeyid-core operations.
pub type Result<T> = std::result::Result<T, Error>;
