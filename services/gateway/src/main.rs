//! WebSocket Gateway Service
//!
//! Upgrades connections on `/ws`, proves the peer holds the private key
//! behind its client identifier, and only then accepts its traffic.

mod channel;
mod config;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::ws::{WebSocket, WebSocketUpgrade, close_code, rejection::WebSocketUpgradeRejection},
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use channel::WsChannel;
use clap::Parser;
use config::GatewayConfig;
use std::{collections::HashMap, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wskeyid_handshake::{
    Authenticator, FrameChannel, KeyResolver, SelfDescribingResolver, TransportError, codec,
};
use wskeyid_resolver::Directory;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    authenticator: Arc<Authenticator<Arc<dyn KeyResolver>>>,
    config: Arc<GatewayConfig>,
}

impl AppState {
    fn new(resolver: Arc<dyn KeyResolver>, config: GatewayConfig) -> Self {
        let authenticator = Authenticator::new(resolver).with_policy(config.policy());
        Self {
            authenticator: Arc::new(authenticator),
            config: Arc::new(config),
        }
    }
}

// === Handlers ===

/// Health check endpoint.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "wskeyid-gateway"
    }))
}

/// Check the origin, then upgrade and authenticate.
async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.config.origins.allows(origin) {
        warn!(?origin, "origin refused");
        return StatusCode::FORBIDDEN.into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let client_id = params
        .get(&state.config.client_id_param)
        .map(|id| id.trim().to_string())
        .unwrap_or_default();

    ws.on_upgrade(move |socket| handle_socket(state, socket, client_id))
}

async fn handle_socket(state: AppState, socket: WebSocket, client_id: String) {
    info!(%client_id, "new connection");
    let mut channel = WsChannel::new(socket);

    let handshake = state.authenticator.run(&mut channel, &client_id);
    let outcome = tokio::time::timeout(state.config.handshake_timeout(), handshake).await;
    match outcome {
        Ok(outcome) if outcome.result.is_ok() => {}
        Ok(_) => {
            channel
                .close(close_code::POLICY, "authentication failed")
                .await;
            return;
        }
        Err(_) => {
            warn!(%client_id, "handshake timed out");
            channel.close(close_code::POLICY, "handshake timed out").await;
            return;
        }
    }

    info!(%client_id, "connected");
    let received = log_messages(&mut channel, &client_id).await;
    info!(%client_id, received, "connection closed");
}

/// Log the type of every inbound message until the peer goes away.
/// Returns how many messages were decoded.
async fn log_messages<C: FrameChannel>(channel: &mut C, client_id: &str) -> usize {
    let mut received = 0;
    loop {
        let frame = match channel.recv().await {
            Ok(frame) => frame,
            Err(TransportError::Closed) => break,
            Err(e) => {
                warn!(%client_id, error = %e, "read failed");
                break;
            }
        };
        let Some(bytes) = frame.data() else {
            continue;
        };
        match codec::decode(bytes) {
            Ok(envelope) => {
                received += 1;
                info!(
                    %client_id,
                    kind = %envelope.kind,
                    text = envelope.data.as_str(),
                    "message received"
                );
            }
            Err(e) => debug!(%client_id, error = %e, "undecodable message"),
        }
    }
    received
}

/// Directory-backed when a file is configured, self-describing otherwise.
fn build_resolver(config: &GatewayConfig) -> anyhow::Result<Arc<dyn KeyResolver>> {
    match &config.directory {
        Some(path) => {
            let directory = Directory::load(path)
                .with_context(|| format!("failed to load directory {}", path.display()))?;
            info!(clients = directory.len(), "client directory loaded");
            Ok(Arc::new(directory))
        }
        None => Ok(Arc::new(SelfDescribingResolver)),
    }
}

/// Build the router.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::parse();
    let resolver = build_resolver(&config)?;
    let listen_addr = config.listen_addr;

    info!(
        %listen_addr,
        origins = %config.origins,
        client_id_param = %config.client_id_param,
        "starting wskeyid gateway"
    );

    let app = build_router(AppState::new(resolver, config));
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;

    info!("gateway listening on {}", listen_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
