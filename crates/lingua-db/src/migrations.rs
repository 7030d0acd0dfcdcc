use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                      TEXT PRIMARY KEY,
                username                TEXT NOT NULL UNIQUE,
                preferred_language      TEXT NOT NULL DEFAULT 'en',
                allow_explicit_content  INTEGER NOT NULL DEFAULT 0,
                auto_delete_seconds     INTEGER,
                public_key              TEXT,
                plan                    TEXT NOT NULL DEFAULT 'FREE',
                created_at              TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE chat_rooms (
                id                   TEXT PRIMARY KEY,
                auto_translate_mode  TEXT NOT NULL DEFAULT 'off',
                created_at           TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE participants (
                chat_room_id  TEXT NOT NULL REFERENCES chat_rooms(id) ON DELETE CASCADE,
                user_id       TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                joined_at     TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (chat_room_id, user_id)
            );

            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                chat_room_id        TEXT NOT NULL REFERENCES chat_rooms(id),
                sender_id           TEXT NOT NULL REFERENCES users(id),
                raw_content         TEXT NOT NULL,
                translations        TEXT NOT NULL DEFAULT '{}',
                translated_from     TEXT,
                is_explicit         INTEGER NOT NULL DEFAULT 0,
                content_ciphertext  BLOB NOT NULL,
                expires_at          TEXT,
                image_url           TEXT,
                audio_url           TEXT,
                audio_duration_sec  INTEGER,
                is_auto_reply       INTEGER NOT NULL DEFAULT 0,
                attachments         TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_messages_room
                ON messages(chat_room_id, created_at);

            CREATE TABLE message_keys (
                message_id   TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id      TEXT NOT NULL REFERENCES users(id),
                wrapped_key  TEXT NOT NULL,
                PRIMARY KEY (message_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
