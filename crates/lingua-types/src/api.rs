use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, MessageOptions};

// -- JWT Claims --

/// JWT claims accepted by the API. Tokens are issued by the account service;
/// `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub expire_seconds: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_duration_sec: Option<u32>,
    #[serde(default)]
    pub is_auto_reply: bool,
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
}

impl SendMessageRequest {
    /// Split the request into the message body and its send options.
    pub fn into_parts(self) -> (String, MessageOptions) {
        let options = MessageOptions {
            expire_seconds: self.expire_seconds,
            image_url: self.image_url,
            audio_url: self.audio_url,
            audio_duration_sec: self.audio_duration_sec,
            is_auto_reply: self.is_auto_reply,
            attachments: self.attachments,
        };
        (self.content, options)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub raw_content: String,
    pub translations: BTreeMap<String, String>,
    pub translated_from: Option<String>,
    pub is_explicit: bool,
    /// Base64 of `nonce || ciphertext`.
    pub content_ciphertext: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration_sec: Option<u32>,
    pub is_auto_reply: bool,
    pub attachments: Option<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Recipient user id -> wrapped content key, as just stored.
    pub wrapped_keys: HashMap<Uuid, String>,
}

impl MessageResponse {
    pub fn new(message: Message, content_ciphertext: String, wrapped_keys: HashMap<Uuid, String>) -> Self {
        Self {
            id: message.id,
            chat_room_id: message.chat_room_id,
            sender_id: message.sender_id,
            raw_content: message.raw_content,
            translations: message.translations,
            translated_from: message.translated_from,
            is_explicit: message.is_explicit,
            content_ciphertext,
            expires_at: message.expires_at,
            image_url: message.image_url,
            audio_url: message.audio_url,
            audio_duration_sec: message.audio_duration_sec,
            is_auto_reply: message.is_auto_reply,
            attachments: message.attachments,
            created_at: message.created_at,
            wrapped_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_defaults_optional_fields() {
        let req: SendMessageRequest = serde_json::from_str(r#"{"content":"hola"}"#).unwrap();
        let (content, options) = req.into_parts();
        assert_eq!(content, "hola");
        assert_eq!(options, MessageOptions::default());
    }

    #[test]
    fn send_request_rejects_unknown_fields() {
        let res = serde_json::from_str::<SendMessageRequest>(r#"{"content":"x","nonce":"y"}"#);
        assert!(res.is_err());
    }
}
