//! HTTP API endpoints.
//!
//! Room lookups for the landing page and a REST alternative to creating a room
//! over the WebSocket. Errors are rendered through `GameError`'s
//! `IntoResponse` impl.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::GameResult;
use crate::protocol::RoomState;
use crate::state::{normalize_room_id, AppState};
use crate::types::{PlayerId, RoomId};
use crate::ws;

/// Full application router: REST endpoints plus the WebSocket
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/exists", get(room_exists))
        .route("/api/word-packs", get(list_word_packs))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub rooms: usize,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        rooms: state.room_count().await,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub room: RoomState,
}

/// Create a room.
///
/// POST /api/rooms
///
/// The admin has no session yet, so it starts out disconnected until the
/// client sends `reconnect` over the WebSocket with the returned ids.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> GameResult<(StatusCode, Json<CreateRoomResponse>)> {
    let room = state.create_room(&req.username).await?;
    let room = state
        .mark_player_disconnected(&room.id, &room.admin_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room.id.clone(),
            player_id: room.admin_id.clone(),
            room: RoomState::from(&room),
        }),
    ))
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GameResult<Json<RoomState>> {
    Ok(Json(state.room_state(&id).await?))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomExistsResponse {
    pub room_id: RoomId,
    pub exists: bool,
}

/// GET /api/rooms/{id}/exists
pub async fn room_exists(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<RoomExistsResponse> {
    Json(RoomExistsResponse {
        exists: state.room_exists(&id).await,
        room_id: normalize_room_id(&id),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPacksResponse {
    pub packs: Vec<String>,
    pub default_pack: String,
}

/// GET /api/word-packs
pub async fn list_word_packs(State(state): State<Arc<AppState>>) -> Json<WordPacksResponse> {
    Json(WordPacksResponse {
        packs: state.words.pack_names(),
        default_pack: state.config.default_word_pack.clone(),
    })
}
