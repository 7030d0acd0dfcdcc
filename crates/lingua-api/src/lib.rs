pub mod messages;
pub mod middleware;
pub mod state;
pub mod store;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// All HTTP routes. Message routes sit behind JWT auth; `/health` is open.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/rooms/{room_id}/messages", post(messages::send_message))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}
