//! Axum web server with WebSocket streaming for visualization.
//!
//! The controller lives behind one lock. A driver task maps its virtual
//! clock onto tokio time: it sleeps until the next armed timer is due (or a
//! handler wakes it because the timers changed), then advances the
//! controller to the real elapsed milliseconds.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Notify, RwLock};
use tokio::time::Instant;
use tower_http::cors::CorsLayer;

use crate::config::SettingChange;
use crate::error::Error;
use crate::events::SearchSnapshot;
use crate::playback::{Playback, PlaybackStatus};

/// Range of seeds picked by manual regeneration.
const REGENERATE_SEEDS: std::ops::RangeInclusive<u32> = 1000..=90_999;

/// Status broadcasts kept for slow WebSocket clients.
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Shared application state.
pub struct AppState {
    playback: RwLock<Playback>,
    epoch: Instant,
    wake: Notify,
    updates: broadcast::Sender<PlaybackStatus>,
}

impl AppState {
    fn new(playback: Playback) -> Self {
        let (updates, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            playback: RwLock::new(playback),
            epoch: Instant::now(),
            wake: Notify::new(),
            updates,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Catch the clock up, run `action`, then publish and wake the driver.
    async fn act<T>(&self, action: impl FnOnce(&mut Playback) -> T) -> (T, PlaybackStatus) {
        let mut playback = self.playback.write().await;
        playback.advance_to(self.elapsed_ms());
        let out = action(&mut *playback);
        let status = self.publish(&mut *playback);
        drop(playback);
        self.wake.notify_one();
        (out, status)
    }

    /// Broadcast the status if anything changed since the last publish.
    fn publish(&self, playback: &mut Playback) -> PlaybackStatus {
        let status = playback.status();
        let events = playback.drain_events();
        if !events.is_empty() {
            tracing::debug!(count = events.len(), "publishing playback events");
            // No receivers is fine.
            let _ = self.updates.send(status.clone());
        }
        status
    }

    /// Fire timers as they come due until the task is dropped.
    async fn drive(self: Arc<Self>) {
        loop {
            let deadline = self.playback.read().await.next_deadline();
            match deadline {
                Some(due_ms) => {
                    let at = self.epoch + std::time::Duration::from_millis(due_ms);
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = self.wake.notified() => continue,
                    }
                }
                None => {
                    self.wake.notified().await;
                    continue;
                }
            }

            let mut playback = self.playback.write().await;
            playback.advance_to(self.elapsed_ms());
            self.publish(&mut *playback);
        }
    }
}

/// Visualization server.
pub struct VisServer {
    state: Arc<AppState>,
}

impl VisServer {
    /// Create a new visualization server around a controller.
    pub fn new(playback: Playback) -> Self {
        Self {
            state: Arc::new(AppState::new(playback)),
        }
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/sequence", get(sequence_handler))
            .route("/api/playback/start", post(start_handler))
            .route("/api/playback/toggle", post(toggle_handler))
            .route("/api/playback/reset", post(reset_handler))
            .route("/api/playback/step", post(step_handler))
            .route("/api/target", post(target_handler))
            .route("/api/regenerate", post(regenerate_handler))
            .route("/api/settings", post(settings_handler))
            // WebSocket for real-time updates
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Spawn the timer driver. Must be called inside a tokio runtime.
    pub fn spawn_driver(&self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.state.clone().drive())
    }

    /// Run the server on the given port.
    pub async fn serve(self, port: u16) -> Result<(), std::io::Error> {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let driver = self.spawn_driver();
        tracing::info!("Visualization server running on http://localhost:{}", port);
        let served = axum::serve(listener, self.router()).await;
        driver.abort();
        served
    }
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let (_, status) = state.act(|_| ()).await;
    Json(status)
}

async fn sequence_handler(State(state): State<Arc<AppState>>) -> Json<SearchSnapshot> {
    let playback = state.playback.read().await;
    Json(playback.snapshot())
}

async fn start_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let (_, status) = state.act(Playback::start).await;
    Json(status)
}

async fn toggle_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let (_, status) = state.act(|p| p.toggle_play()).await;
    Json(status)
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let (_, status) = state.act(Playback::reset).await;
    Json(status)
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StepDirection {
    Forward,
    Backward,
}

#[derive(Deserialize)]
struct StepRequest {
    direction: StepDirection,
}

async fn step_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> Json<PlaybackStatus> {
    let (_, status) = state.act(|p| step(p, req.direction)).await;
    Json(status)
}

fn step(playback: &mut Playback, direction: StepDirection) -> bool {
    match direction {
        StepDirection::Forward => playback.step_forward(),
        StepDirection::Backward => playback.step_backward(),
    }
}

#[derive(Deserialize)]
struct TargetRequest {
    value: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn target_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TargetRequest>,
) -> axum::response::Response {
    let (result, status) = state.act(|p| p.submit_target(&req.value)).await;
    match result {
        Ok(_) => Json(status).into_response(),
        Err(err) => bad_request(err),
    }
}

fn bad_request(err: Error) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn regenerate_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let seed = rand::thread_rng().gen_range(REGENERATE_SEEDS);
    tracing::info!(seed, "regenerating sequence");
    let (_, status) = state.act(|p| p.regenerate(seed)).await;
    Json(status)
}

async fn settings_handler(
    State(state): State<Arc<AppState>>,
    Json(change): Json<SettingChange>,
) -> Json<PlaybackStatus> {
    let (_, status) = state.act(|p| p.update_settings(change)).await;
    Json(status)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut updates = state.updates.subscribe();

    // Send initial state
    let (_, status) = state.act(|_| ()).await;
    if send(&mut socket, &WsResponse::Status(status)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(status) => {
                    if send(&mut socket, &WsResponse::Status(status)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "websocket client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let response = match serde_json::from_str::<WsCommand>(&text) {
                        Ok(cmd) => handle_ws_command(&state, cmd).await,
                        Err(err) => WsResponse::Error { message: err.to_string() },
                    };
                    if send(&mut socket, &response).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn send(socket: &mut WebSocket, response: &WsResponse) -> Result<(), axum::Error> {
    match serde_json::to_string(response) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(err) => {
            tracing::warn!(%err, "failed to encode websocket response");
            Ok(())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    GetStatus,
    GetSequence,
    Start,
    Toggle,
    Reset,
    Step { direction: StepDirection },
    Target { value: String },
    Regenerate,
    Settings { change: SettingChange },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsResponse {
    Status(PlaybackStatus),
    Sequence(SearchSnapshot),
    Error { message: String },
}

async fn handle_ws_command(state: &Arc<AppState>, cmd: WsCommand) -> WsResponse {
    let status = match cmd {
        WsCommand::GetStatus => state.act(|_| ()).await.1,
        WsCommand::GetSequence => {
            let playback = state.playback.read().await;
            return WsResponse::Sequence(playback.snapshot());
        }
        WsCommand::Start => state.act(Playback::start).await.1,
        WsCommand::Toggle => state.act(|p| p.toggle_play()).await.1,
        WsCommand::Reset => state.act(Playback::reset).await.1,
        WsCommand::Step { direction } => state.act(|p| step(p, direction)).await.1,
        WsCommand::Target { value } => match state.act(|p| p.submit_target(&value)).await {
            (Ok(_), status) => status,
            (Err(err), _) => {
                return WsResponse::Error {
                    message: err.to_string(),
                }
            }
        },
        WsCommand::Regenerate => {
            let seed = rand::thread_rng().gen_range(REGENERATE_SEEDS);
            state.act(|p| p.regenerate(seed)).await.1
        }
        WsCommand::Settings { change } => state.act(|p| p.update_settings(change)).await.1,
    };
    WsResponse::Status(status)
}
