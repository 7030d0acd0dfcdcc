/// Database row types, mapped straight from SQLite columns.
/// Converted into lingua-types models at the query boundary.
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use lingua_types::models::{Message, Participant, Plan, SenderProfile};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub preferred_language: String,
    pub allow_explicit_content: bool,
    pub auto_delete_seconds: Option<i64>,
    pub public_key: Option<String>,
    pub plan: String,
}

impl UserRow {
    pub fn into_profile(self) -> Result<SenderProfile> {
        Ok(SenderProfile {
            user_id: parse_uuid(&self.id)?,
            username: self.username,
            preferred_language: self.preferred_language,
            allow_explicit_content: self.allow_explicit_content,
            auto_delete_seconds: self.auto_delete_seconds,
            public_key: self.public_key,
            plan: Plan::from_stored(&self.plan),
        })
    }

    pub fn into_participant(self) -> Result<Participant> {
        Ok(self.into_profile()?.as_participant())
    }
}

pub struct MessageRow {
    pub id: String,
    pub chat_room_id: String,
    pub sender_id: String,
    pub raw_content: String,
    pub translations: String,
    pub translated_from: Option<String>,
    pub is_explicit: bool,
    pub content_ciphertext: Vec<u8>,
    pub expires_at: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration_sec: Option<u32>,
    pub is_auto_reply: bool,
    pub attachments: Option<String>,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        let translations: BTreeMap<String, String> = serde_json::from_str(&self.translations)
            .with_context(|| format!("Bad translations JSON on message {}", self.id))?;
        let attachments = self
            .attachments
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .with_context(|| format!("Bad attachments JSON on message {}", self.id))?;

        Ok(Message {
            id: parse_uuid(&self.id)?,
            chat_room_id: parse_uuid(&self.chat_room_id)?,
            sender_id: parse_uuid(&self.sender_id)?,
            raw_content: self.raw_content,
            translations,
            translated_from: self.translated_from,
            is_explicit: self.is_explicit,
            content_ciphertext: self.content_ciphertext,
            expires_at: self.expires_at.as_deref().map(parse_time).transpose()?,
            image_url: self.image_url,
            audio_url: self.audio_url,
            audio_duration_sec: self.audio_duration_sec,
            is_auto_reply: self.is_auto_reply,
            attachments,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Bad UUID in database: {}", s))
}

pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Bad timestamp in database: {}", s))?
        .with_timezone(&Utc))
}

/// Fixed-width UTC so stored timestamps sort as text.
pub(crate) fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}
