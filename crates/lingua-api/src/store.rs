use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use uuid::Uuid;

use lingua_db::Database;
use lingua_messaging::{MembershipDirectory, MessageRepository};
use lingua_types::models::{AutoTranslateMode, Message, MessageKey, Participant, SenderProfile};

/// SQLite-backed directory and repository. Every call runs on the blocking
/// pool so the connection mutex is never held on an async worker.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?
    }
}

#[async_trait]
impl MembershipDirectory for SqliteStore {
    async fn find_sender(&self, user_id: Uuid) -> Result<Option<SenderProfile>> {
        self.blocking(move |db| db.get_sender(user_id)).await
    }

    async fn is_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.blocking(move |db| db.is_participant(room_id, user_id)).await
    }

    async fn participants(&self, room_id: Uuid) -> Result<Vec<Participant>> {
        self.blocking(move |db| db.get_participants(room_id)).await
    }
}

#[async_trait]
impl MessageRepository for SqliteStore {
    async fn auto_translate_mode(&self, room_id: Uuid) -> Result<AutoTranslateMode> {
        self.blocking(move |db| db.get_auto_translate_mode(room_id)).await
    }

    async fn insert_message(&self, message: &Message, keys: &[MessageKey]) -> Result<()> {
        let message = message.clone();
        let keys = keys.to_vec();
        self.blocking(move |db| db.insert_message_with_keys(&message, &keys)).await
    }

    async fn merge_translations(&self, message_id: Uuid, translations: &BTreeMap<String, String>) -> Result<()> {
        let translations = translations.clone();
        self.blocking(move |db| db.merge_translations(message_id, &translations)).await
    }
}
