use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use lingua_types::models::{AutoTranslateMode, Message, MessageKey, Participant, SenderProfile};

/// Resolves users and room membership.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn find_sender(&self, user_id: Uuid) -> Result<Option<SenderProfile>>;

    async fn is_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Every member of the room, the sender included.
    async fn participants(&self, room_id: Uuid) -> Result<Vec<Participant>>;
}

/// Durable storage for messages, their wrapped keys and room settings.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn auto_translate_mode(&self, room_id: Uuid) -> Result<AutoTranslateMode>;

    /// Store the message and upsert its keys as one unit of work: either
    /// everything is visible afterwards or nothing is.
    async fn insert_message(&self, message: &Message, keys: &[MessageKey]) -> Result<()>;

    /// Add or replace the given languages in the message's translations.
    async fn merge_translations(&self, message_id: Uuid, translations: &BTreeMap<String, String>) -> Result<()>;
}

pub trait Moderator: Send + Sync {
    fn classify_explicit(&self, text: &str) -> Result<bool>;

    fn sanitize(&self, text: &str) -> Result<String>;
}

/// Ciphertext shared by all recipients plus one wrapped key per recipient.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    /// Recipient user id -> base64 wrapped content key.
    pub wrapped_keys: HashMap<Uuid, String>,
}

pub trait EnvelopeEncryptor: Send + Sync {
    /// Encrypt once and wrap the content key for the sender and every
    /// recipient that has a public key.
    fn encrypt_for_recipients(
        &self,
        plaintext: &[u8],
        sender: &Participant,
        recipients: &[Participant],
    ) -> Result<Envelope>;
}

/// Atomic check-and-consume admission control keyed by string.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}
