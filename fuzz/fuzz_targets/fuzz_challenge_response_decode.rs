//! Fuzz target for inbound frame decoding.
//!
//! Every frame a peer sends during the handshake goes through
//! `decode_challenge_response`; whatever decodes is then verified. Neither
//! step may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::LazyLock;
use wskeyid_core::{ClientKey, PublicKey};
use wskeyid_handshake::{P256Backend, SignatureVerifier, codec};

static KEY: LazyLock<PublicKey> = LazyLock::new(|| ClientKey::generate().public_key());

fuzz_target!(|data: &[u8]| {
    if let Ok(signed) = codec::decode_challenge_response(data) {
        let verifier = SignatureVerifier::new(P256Backend);
        let _ = verifier.verify(&KEY, &signed.payload, &signed.signature);
    }

    // Generic envelope parsing as well
    let _ = codec::decode(data);
    let _ = codec::decode_server(data);
    let _: Result<serde_json::Value, _> = serde_json::from_slice(data);
});
