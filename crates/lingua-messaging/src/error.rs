use thiserror::Error;
use uuid::Uuid;

use lingua_translate::TranslateError;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("unknown sender {0}")]
    Unauthorized(Uuid),

    #[error("user {user_id} is not a member of room {room_id}")]
    Forbidden { user_id: Uuid, room_id: Uuid },

    #[error("invalid message: {0}")]
    InvalidInput(String),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslateError),

    /// Moderation, encryption or repository failure.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}
