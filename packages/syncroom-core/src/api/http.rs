//! HTTP route handlers.
//!
//! Read-only views of the room registry plus the WebSocket upgrade route.
//! All handlers are thin - mutation only happens through the sync router.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_error, api_success};
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::{SyncError, SyncResult};
use crate::protocol_constants::SERVICE_ID;

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{room}", get(get_room))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
///
/// Always returns 200 OK while the server is responding.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "rooms": state.registry.len(),
        "connections": state.ws_manager.connection_count(),
    }))
}

/// Lists every live room with its member count, ordered by id.
async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms: Vec<_> = state
        .registry
        .summaries()
        .into_iter()
        .map(|mut summary| {
            summary.members = state.ws_manager.member_count(&summary.room);
            summary
        })
        .collect();
    api_success(json!({ "rooms": rooms }))
}

/// Returns the same snapshot a joining client would receive.
///
/// Reading a room never creates it.
async fn get_room(
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> SyncResult<impl IntoResponse> {
    let now = state.clock.now_millis();
    state
        .registry
        .snapshot(&room, now)
        .map(api_success)
        .ok_or(SyncError::RoomNotFound(room))
}

async fn not_found() -> Response {
    api_error(StatusCode::NOT_FOUND, "not_found", "No such route").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap_services;
    use crate::state::Config;
    use crate::sync::JoinRequest;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn join(state: &AppState, room: &str) {
        state.router.join(
            "ws-test",
            &JoinRequest {
                username: "ann".into(),
                room: room.into(),
            },
        );
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        join(&state, "movie");

        let body = body_json(health_check(State(state)).await.into_response()).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_ID);
        assert_eq!(body["rooms"], 1);
        assert_eq!(body["connections"], 0);
    }

    #[tokio::test]
    async fn list_rooms_returns_summaries() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        join(&state, "b");
        join(&state, "a");
        let (guard, _rx) = state.ws_manager.register();
        state.ws_manager.join_room(guard.id(), "a", "ann");

        let body = body_json(list_rooms(State(state)).await.into_response()).await;

        let rooms = body["rooms"].as_array().unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0]["room"], "a");
        assert_eq!(rooms[0]["members"], 1);
        assert_eq!(rooms[1]["members"], 0);
        assert_eq!(rooms[0]["queueLength"], 0);
    }

    #[tokio::test]
    async fn get_room_returns_snapshot() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();
        join(&state, "movie");

        let response = get_room(Path("movie".into()), State(state))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        assert_eq!(body["current_source"], "youtube");
        assert_eq!(body["is_playing"], false);
        assert_eq!(body["queue"], json!([]));
    }

    #[tokio::test]
    async fn get_unknown_room_is_404_and_does_not_create() {
        let services = bootstrap_services(&Config::default()).unwrap();
        let state = services.app_state();

        let response = get_room(Path("ghost".into()), State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "room_not_found");
        assert!(!state.registry.contains("ghost"));
    }
}
