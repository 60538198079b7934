use rusqlite::Connection;
use tracing::info;

use crate::Result;
use crate::models::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            email             TEXT NOT NULL UNIQUE,
            username          TEXT NOT NULL UNIQUE,
            image_url         TEXT NOT NULL DEFAULT '{DEFAULT_IMAGE_URL}',
            header_image_url  TEXT NOT NULL DEFAULT '{DEFAULT_HEADER_IMAGE_URL}',
            bio               TEXT,
            location          TEXT,
            password          TEXT NOT NULL,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text        TEXT NOT NULL CHECK (length(text) BETWEEN 1 AND 140),
            timestamp   TEXT NOT NULL,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, timestamp);

        CREATE TABLE IF NOT EXISTS follows (
            follower_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            followee_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (follower_id, followee_id),
            CHECK (follower_id <> followee_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followee
            ON follows(followee_id);

        CREATE TABLE IF NOT EXISTS likes (
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message_id  INTEGER NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, message_id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_message
            ON likes(message_id);
        ",
    ))?;

    info!("Database migrations complete");
    Ok(())
}
