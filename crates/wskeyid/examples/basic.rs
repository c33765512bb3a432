//! Basic wskeyid Example
//!
//! Demonstrates core wskeyid functionality:
//! - Creating a client identity
//! - Registering it in a directory
//! - Authenticating it over an in-process connection
//!
//! Run with: cargo run -p wskeyid --example basic

use wskeyid::handshake::{ServerMessage, codec, respond_to_challenge};
use wskeyid::{Authenticator, ClientId, ClientKey, Directory, FrameChannel, MemoryChannel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== wskeyid Basic Example ===\n");

    println!("1. Creating identity...");
    let key = ClientKey::generate();
    let client_id = ClientId::new(key.public_key());
    println!("   Client ID: {}", client_id);
    println!();

    println!("2. Registering in directory...");
    let directory = Directory::new();
    directory.register("alice", &client_id.to_string())?;
    println!("   Registered as \"alice\" ✓");
    println!();

    println!("3. Performing handshake...");
    let (mut server_end, mut peer) = MemoryChannel::pair();
    let server = tokio::spawn(async move {
        let auth = Authenticator::new(directory);
        auth.authenticate(&mut server_end, "alice").await
    });

    let frame = peer.recv().await?;
    let ServerMessage::ServerChallenge(challenge) =
        codec::decode_server(frame.data().unwrap_or_default())?
    else {
        return Err("expected a challenge".into());
    };
    let reply = respond_to_challenge(&key, &challenge)?;
    peer.send_text(codec::encode_client(&reply)?).await?;

    server.await??;
    println!("   Handshake complete ✓");
    println!();

    println!("=== Done ===");
    println!("The server knows the peer holds alice's key.");

    Ok(())
}
