use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Subscription tier of a user. Drives the message expiry ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    /// Parse a stored plan name. Unknown plans fall back to `Free`, the most
    /// restrictive tier.
    pub fn from_stored(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "FREE" => Self::Free,
            "PREMIUM" => Self::Premium,
            other => {
                warn!("Unknown plan '{}', treating as FREE", other);
                Self::Free
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-room switch for background translation of every stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoTranslateMode {
    On,
    Off,
}

impl AutoTranslateMode {
    /// Only the literal `on` enables the mode; anything else is off.
    pub fn from_stored(value: &str) -> Self {
        if value.eq_ignore_ascii_case("on") {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

/// A member of a chat room, as seen by the send pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
    pub preferred_language: String,
    pub allow_explicit_content: bool,
    /// Base64 X25519 public key. Participants without one receive no wrapped key.
    pub public_key: Option<String>,
}

/// The sending user, with the account settings that shape a new message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub user_id: Uuid,
    pub username: String,
    pub preferred_language: String,
    pub allow_explicit_content: bool,
    /// Default time-to-live for the sender's messages. `None` or `<= 0` means no expiry.
    pub auto_delete_seconds: Option<i64>,
    pub public_key: Option<String>,
    pub plan: Plan,
}

impl SenderProfile {
    pub fn as_participant(&self) -> Participant {
        Participant {
            user_id: self.user_id,
            username: self.username.clone(),
            preferred_language: self.preferred_language.clone(),
            allow_explicit_content: self.allow_explicit_content,
            public_key: self.public_key.clone(),
        }
    }
}

/// Optional send-time parameters passed through to the stored message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    pub expire_seconds: Option<i64>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration_sec: Option<u32>,
    pub is_auto_reply: bool,
    pub attachments: Option<serde_json::Value>,
}

/// A stored chat message.
///
/// `raw_content` is the moderated plaintext and is kept next to the
/// ciphertext for server-side search, translation and moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    pub raw_content: String,
    /// Language code -> translated text.
    pub translations: BTreeMap<String, String>,
    pub translated_from: Option<String>,
    pub is_explicit: bool,
    pub content_ciphertext: Vec<u8>,
    pub expires_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub audio_duration_sec: Option<u32>,
    pub is_auto_reply: bool,
    pub attachments: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// A recipient's wrapped copy of a message's content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKey {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub wrapped_key: String,
}
