use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};
use tracing::debug;
use uuid::Uuid;

use lingua_types::models::{AutoTranslateMode, Message, MessageKey, Participant, SenderProfile};

use crate::Database;
use crate::models::{MessageRow, UserRow, format_time, parse_uuid};

const USER_COLUMNS: &str =
    "u.id, u.username, u.preferred_language, u.allow_explicit_content, u.auto_delete_seconds, u.public_key, u.plan";

const MESSAGE_COLUMNS: &str = "id, chat_room_id, sender_id, raw_content, translations, translated_from, \
     is_explicit, content_ciphertext, expires_at, image_url, audio_url, audio_duration_sec, \
     is_auto_reply, attachments, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, profile: &SenderProfile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, preferred_language, allow_explicit_content, auto_delete_seconds, public_key, plan)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    profile.user_id.to_string(),
                    profile.username,
                    profile.preferred_language,
                    profile.allow_explicit_content,
                    profile.auto_delete_seconds,
                    profile.public_key,
                    profile.plan.as_str(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_sender(&self, user_id: Uuid) -> Result<Option<SenderProfile>> {
        self.with_conn(|conn| query_user(conn, &user_id.to_string()))?
            .map(UserRow::into_profile)
            .transpose()
    }

    // -- Rooms --

    pub fn create_room(&self, room_id: Uuid, mode: AutoTranslateMode) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_rooms (id, auto_translate_mode) VALUES (?1, ?2)",
                (room_id.to_string(), mode.as_str()),
            )?;
            Ok(())
        })
    }

    pub fn set_auto_translate_mode(&self, room_id: Uuid, mode: AutoTranslateMode) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chat_rooms SET auto_translate_mode = ?2 WHERE id = ?1",
                (room_id.to_string(), mode.as_str()),
            )?;
            if changed == 0 {
                return Err(anyhow!("Room not found: {}", room_id));
            }
            Ok(())
        })
    }

    /// Missing rooms read as `Off`.
    pub fn get_auto_translate_mode(&self, room_id: Uuid) -> Result<AutoTranslateMode> {
        let stored: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT auto_translate_mode FROM chat_rooms WHERE id = ?1",
                [room_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })?;
        Ok(stored.map_or(AutoTranslateMode::Off, |s| AutoTranslateMode::from_stored(&s)))
    }

    // -- Participants --

    pub fn add_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO participants (chat_room_id, user_id) VALUES (?1, ?2)",
                (room_id.to_string(), user_id.to_string()),
            )?;
            Ok(())
        })
    }

    pub fn is_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM participants WHERE chat_room_id = ?1 AND user_id = ?2",
                    (room_id.to_string(), user_id.to_string()),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Room members in join order.
    pub fn get_participants(&self, room_id: Uuid) -> Result<Vec<Participant>> {
        self.with_conn(|conn| query_participants(conn, &room_id.to_string()))?
            .into_iter()
            .map(UserRow::into_participant)
            .collect()
    }

    // -- Messages --

    /// Store a message and its wrapped keys in one transaction.
    pub fn insert_message_with_keys(&self, message: &Message, keys: &[MessageKey]) -> Result<()> {
        let translations = serde_json::to_string(&message.translations)?;
        let attachments = message.attachments.as_ref().map(serde_json::to_string).transpose()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!("INSERT INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)", MESSAGE_COLUMNS),
                params![
                    message.id.to_string(),
                    message.chat_room_id.to_string(),
                    message.sender_id.to_string(),
                    message.raw_content,
                    translations,
                    message.translated_from,
                    message.is_explicit,
                    message.content_ciphertext,
                    message.expires_at.map(format_time),
                    message.image_url,
                    message.audio_url,
                    message.audio_duration_sec,
                    message.is_auto_reply,
                    attachments,
                    format_time(message.created_at),
                ],
            )?;
            for key in keys {
                upsert_key(&tx, key)?;
            }
            tx.commit()?;
            Ok(())
        })?;

        debug!("Inserted message {} with {} keys", message.id, keys.len());
        Ok(())
    }

    /// Insert or replace one recipient's wrapped key.
    pub fn upsert_message_key(&self, key: &MessageKey) -> Result<()> {
        self.with_conn(|conn| upsert_key(conn, key))
    }

    pub fn get_message(&self, message_id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, &message_id.to_string()))?
            .map(MessageRow::into_message)
            .transpose()
    }

    pub fn get_message_keys(&self, message_id: Uuid) -> Result<Vec<MessageKey>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, wrapped_key FROM message_keys WHERE message_id = ?1 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map([message_id.to_string()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(user_id, wrapped_key)| {
                Ok(MessageKey {
                    message_id,
                    user_id: parse_uuid(&user_id)?,
                    wrapped_key,
                })
            })
            .collect()
    }

    /// Add `translations` to a stored message. Existing languages not named in
    /// `translations` are kept.
    pub fn merge_translations(&self, message_id: Uuid, translations: &BTreeMap<String, String>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let stored: String = tx
                .query_row(
                    "SELECT translations FROM messages WHERE id = ?1",
                    [message_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| anyhow!("Message not found: {}", message_id))?;

            let mut merged: BTreeMap<String, String> = serde_json::from_str(&stored)?;
            merged.extend(translations.iter().map(|(k, v)| (k.clone(), v.clone())));

            tx.execute(
                "UPDATE messages SET translations = ?2 WHERE id = ?1",
                (message_id.to_string(), serde_json::to_string(&merged)?),
            )?;
            tx.commit()?;
            Ok(())
        })
    }
}

fn upsert_key(conn: &Connection, key: &MessageKey) -> Result<()> {
    conn.execute(
        "INSERT INTO message_keys (message_id, user_id, wrapped_key) VALUES (?1, ?2, ?3)
         ON CONFLICT(message_id, user_id) DO UPDATE SET wrapped_key = excluded.wrapped_key",
        (key.message_id.to_string(), key.user_id.to_string(), &key.wrapped_key),
    )?;
    Ok(())
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        preferred_language: row.get(2)?,
        allow_explicit_content: row.get(3)?,
        auto_delete_seconds: row.get(4)?,
        public_key: row.get(5)?,
        plan: row.get(6)?,
    })
}

fn query_user(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS))?;
    let row = stmt.query_row([id], map_user).optional()?;
    Ok(row)
}

fn query_participants(conn: &Connection, room_id: &str) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}
         FROM participants p
         JOIN users u ON p.user_id = u.id
         WHERE p.chat_room_id = ?1
         ORDER BY p.joined_at, p.rowid",
        USER_COLUMNS
    ))?;

    let rows = stmt
        .query_map([room_id], map_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS))?;

    let row = stmt
        .query_row([id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                chat_room_id: row.get(1)?,
                sender_id: row.get(2)?,
                raw_content: row.get(3)?,
                translations: row.get(4)?,
                translated_from: row.get(5)?,
                is_explicit: row.get(6)?,
                content_ciphertext: row.get(7)?,
                expires_at: row.get(8)?,
                image_url: row.get(9)?,
                audio_url: row.get(10)?,
                audio_duration_sec: row.get(11)?,
                is_auto_reply: row.get(12)?,
                attachments: row.get(13)?,
                created_at: row.get(14)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
