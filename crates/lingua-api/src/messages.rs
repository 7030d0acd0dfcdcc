use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{error, warn};
use uuid::Uuid;

use lingua_messaging::ComposeError;
use lingua_types::api::{Claims, MessageResponse, SendMessageRequest};

use crate::state::AppState;

/// Compose and store a message, then hand it to the auto-translate sidecar.
/// The response does not wait for the sidecar.
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let (content, options) = req.into_parts();

    let composed = state
        .composer
        .create_message(claims.sub, room_id, &content, options)
        .await
        .map_err(|e| status_for(&e))?;

    let ciphertext = B64.encode(&composed.message.content_ciphertext);
    let response = MessageResponse::new(composed.message.clone(), ciphertext, composed.wrapped_keys);

    state.auto_translator.spawn(composed.message);

    Ok((StatusCode::CREATED, Json(response)))
}

fn status_for(err: &ComposeError) -> StatusCode {
    match err {
        ComposeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ComposeError::Forbidden { .. } => StatusCode::FORBIDDEN,
        ComposeError::InvalidInput(reason) => {
            warn!("Rejected message: {}", reason);
            StatusCode::BAD_REQUEST
        }
        ComposeError::Translation(e) => {
            error!("Translation failed during send: {}", e);
            StatusCode::BAD_GATEWAY
        }
        ComposeError::Collaborator(e) => {
            error!("Send failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
