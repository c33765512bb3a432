//! Fuzz target for client identifier parsing.
//!
//! Tests that `ClientId::from_str` handles arbitrary input safely, and that
//! anything it accepts renders back to an identifier that parses to the
//! same key.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str::FromStr;
use wskeyid_core::ClientId;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data)
        && let Ok(id) = ClientId::from_str(input)
    {
        let rendered = id.to_string();
        let reparsed = ClientId::from_str(&rendered).expect("canonical form must parse");
        assert_eq!(reparsed.public_key(), id.public_key());
    }
});
