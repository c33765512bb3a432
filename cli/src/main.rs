//! wskeyid CLI - WebSocket key-identity command-line tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use wskeyid_core::keys::decode_base64_lenient;
use wskeyid_core::{ClientId, ClientKey};
use wskeyid_handshake::{
    Authenticator, ClientMessage, FrameChannel, MemoryChannel, SelfDescribingResolver,
    ServerMessage, codec, respond_to_challenge, sign_payload,
};

/// WebSocket key-identity CLI
#[derive(Parser)]
#[command(name = "wskeyid")]
#[command(about = "WebSocket key-identity - prove who holds the key", long_about = None)]
struct Cli {
    /// Path to identity file (default: platform config dir)
    #[arg(short, long, global = true)]
    identity: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identity management
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Handshake testing
    Handshake {
        #[command(subcommand)]
        action: HandshakeAction,
    },
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Generate a new identity
    Generate {
        /// Force overwrite existing identity
        #[arg(short, long)]
        force: bool,
    },
    /// Show current identity
    Show,
    /// Export public identity (safe to share)
    Export,
}

#[derive(Subcommand)]
enum HandshakeAction {
    /// Run a full handshake against an in-process server
    Test,
    /// Sign a challenge payload and print the response message
    Sign {
        /// Base64 challenge payload, as sent in SERVER_CHALLENGE
        #[arg(short, long)]
        payload: String,
    },
}

/// Stored identity file format.
#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    client_id: String,
    #[serde(with = "hex_bytes")]
    secret_key: [u8; 32],
    created_at: String,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid key length"))
    }
}

fn get_identity_path(cli_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        return Ok(path);
    }

    let proj_dirs = directories::ProjectDirs::from("org", "wskeyid", "wskeyid")
        .context("Could not determine config directory")?;

    let config_dir = proj_dirs.config_dir();
    std::fs::create_dir_all(config_dir)?;

    Ok(config_dir.join("identity.json"))
}

fn load_identity(path: &Path) -> Result<(ClientKey, ClientId)> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read identity file: {}", path.display()))?;

    let stored: StoredIdentity =
        serde_json::from_str(&contents).context("Invalid identity file format")?;

    let key = ClientKey::from_bytes(&stored.secret_key)?;
    let client_id = ClientId::new(key.public_key());

    if client_id.to_string() != stored.client_id {
        anyhow::bail!("Identity file corrupted: client ID mismatch");
    }

    Ok((key, client_id))
}

fn save_identity(path: &Path, key: &ClientKey) -> Result<()> {
    let stored = StoredIdentity {
        client_id: ClientId::new(key.public_key()).to_string(),
        secret_key: key.to_bytes(),
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    let contents = serde_json::to_string_pretty(&stored)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    // Secret key: owner read/write only, from the moment the file exists
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Could not create identity file: {}", path.display()))?;

    // An existing file keeps its old mode when reopened
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents.as_bytes())?;

    Ok(())
}

fn cmd_identity_generate(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Identity already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    let key = ClientKey::generate();
    save_identity(&path, &key)?;

    println!("Generated new identity:");
    println!("  Client ID: {}", ClientId::new(key.public_key()));
    println!("  Saved to: {}", path.display());

    Ok(())
}

fn cmd_identity_show(path: PathBuf) -> Result<()> {
    let (_, client_id) = load_identity(&path)?;

    println!("Identity:");
    println!("  Client ID: {}", client_id);
    println!("  Key ID: {}", client_id.key_id());
    println!("  File: {}", path.display());

    Ok(())
}

fn cmd_identity_export(path: PathBuf) -> Result<()> {
    let (_, client_id) = load_identity(&path)?;

    // Public information only
    let export = serde_json::json!({
        "clientId": client_id.to_string(),
        "publicKey": client_id.key_id(),
    });

    println!("{}", serde_json::to_string_pretty(&export)?);

    Ok(())
}

async fn cmd_handshake_test(path: PathBuf) -> Result<()> {
    let (key, client_id) = load_identity(&path)?;
    let client_id = client_id.to_string();

    println!("Testing handshake...");
    println!("  Client ID: {}", client_id);
    println!();

    simulate_handshake(&key, &client_id).await?;

    println!();
    println!("✓ Handshake successful!");

    Ok(())
}

/// Drive our side of the handshake against a local authenticator.
async fn simulate_handshake(key: &ClientKey, client_id: &str) -> Result<()> {
    let (mut server_end, mut peer) = MemoryChannel::pair();
    let server_id = client_id.to_string();
    let server = tokio::spawn(async move {
        let auth = Authenticator::new(SelfDescribingResolver);
        auth.authenticate(&mut server_end, &server_id).await
    });
    println!("1. Connected");

    let challenge = match next_message(&mut peer).await? {
        ServerMessage::ServerChallenge(challenge) => challenge,
        other => anyhow::bail!("Expected SERVER_CHALLENGE, got {}", describe(&other)),
    };
    println!(
        "2. Received SERVER_CHALLENGE (payload: {}...)",
        preview(&challenge.payload)
    );

    let reply = respond_to_challenge(key, &challenge)?;
    let ClientMessage::ChallengeResponse(response) = &reply;
    println!(
        "3. Sent CHALLENGE_RESPONSE (sig: {}...)",
        preview(&response.signature)
    );
    peer.send_text(codec::encode_client(&reply)?).await?;

    match next_message(&mut peer).await? {
        ServerMessage::Authorized(_) => println!("4. Received AUTHORIZED"),
        other => anyhow::bail!("Handshake rejected: {}", describe(&other)),
    }

    server
        .await
        .context("Server task failed")?
        .context("Server rejected the handshake")?;
    Ok(())
}

async fn next_message(peer: &mut MemoryChannel) -> Result<ServerMessage> {
    let frame = peer.recv().await.context("Server closed the connection")?;
    let bytes = frame.data().context("Expected a data frame")?;
    Ok(codec::decode_server(bytes)?)
}

fn describe(message: &ServerMessage) -> String {
    match message {
        ServerMessage::ClientError(e) | ServerMessage::ServerError(e) => {
            format!("{} ({}): {}", message.kind(), e.title, e.detail)
        }
        other => other.kind().to_string(),
    }
}

fn preview(text: &str) -> &str {
    text.get(..16).unwrap_or(text)
}

fn cmd_handshake_sign(path: PathBuf, payload: &str) -> Result<()> {
    let (key, _) = load_identity(&path)?;
    let raw = decode_base64_lenient(payload.trim()).context("Payload is not base64")?;

    let message = ClientMessage::ChallengeResponse(sign_payload(&key, &raw));
    println!("{}", serde_json::to_string_pretty(&message)?);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let identity_path = get_identity_path(cli.identity)?;

    match cli.command {
        Commands::Identity { action } => match action {
            IdentityAction::Generate { force } => cmd_identity_generate(identity_path, force),
            IdentityAction::Show => cmd_identity_show(identity_path),
            IdentityAction::Export => cmd_identity_export(identity_path),
        },
        Commands::Handshake { action } => match action {
            HandshakeAction::Test => cmd_handshake_test(identity_path).await,
            HandshakeAction::Sign { payload } => cmd_handshake_sign(identity_path, &payload),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_identity(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wskeyid-cli-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_identity_file() {
        let path = temp_identity("file");
        let key = ClientKey::generate();
        save_identity(&path, &key).unwrap();

        let (loaded, client_id) = load_identity(&path).unwrap();
        assert_eq!(loaded.to_bytes(), key.to_bytes());
        assert_eq!(*client_id.public_key(), key.public_key());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_overwrite_tightens_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_identity("overwrite");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let key = ClientKey::generate();
        save_identity(&path, &key).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        let (loaded, _) = load_identity(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(loaded.to_bytes(), key.to_bytes());
    }

    #[test]
    fn test_tampered_identity_rejected() {
        let path = temp_identity("tampered");
        save_identity(&path, &ClientKey::generate()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut stored: StoredIdentity = serde_json::from_str(&contents).unwrap();
        stored.secret_key = ClientKey::generate().to_bytes();
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let err = load_identity(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("client ID mismatch"));
    }

    #[tokio::test]
    async fn test_simulated_handshake() {
        let key = ClientKey::generate();
        let client_id = ClientId::new(key.public_key()).to_string();
        simulate_handshake(&key, &client_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_simulated_handshake_with_wrong_id() {
        let key = ClientKey::generate();
        let other = ClientId::new(ClientKey::generate().public_key()).to_string();
        let err = simulate_handshake(&key, &other).await.unwrap_err();
        assert!(err.to_string().contains("Signature verification failed"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abc"), "abc");
        assert_eq!(preview("0123456789abcdefXYZ"), "0123456789abcdef");
    }
}
