use crate::room::RoomManager;
use crate::signaling::{SignalingService, ws_handler};
use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub signaling: SignalingService,
    pub rooms: RoomManager,
}

impl AppState {
    pub fn new() -> Self {
        let signaling = SignalingService::new();
        let rooms = RoomManager::new(Arc::new(signaling.clone()));
        Self { signaling, rooms }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/{room}", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    serve_on(listener).await
}

/// Run the relay on an already bound listener.
pub async fn serve_on(listener: TcpListener) -> anyhow::Result<()> {
    serve_with(listener, AppState::new()).await
}

pub async fn serve_with(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Signaling relay listening on ws://{}/ws/{{room}}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Relay server failed")
}
