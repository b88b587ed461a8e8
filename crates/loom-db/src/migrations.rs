use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (auth + conversations)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              BLOB PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                hashed_password TEXT NOT NULL,
                is_active       INTEGER NOT NULL DEFAULT 1,
                role            TEXT NOT NULL DEFAULT 'USER',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE tokens (
                id          BLOB PRIMARY KEY,
                user_id     BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at  TEXT NOT NULL,
                is_active   INTEGER NOT NULL DEFAULT 1,
                ip_address  TEXT,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX ix_tokens_user_id ON tokens(user_id);
            CREATE INDEX ix_tokens_ip_address ON tokens(ip_address);

            CREATE TABLE conversations (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL,
                model_type  TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX ix_conversations_model_type ON conversations(model_type);

            CREATE TABLE messages (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id   INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                prompt_content    TEXT NOT NULL,
                response_content  TEXT NOT NULL,
                prompt_tokens     INTEGER,
                response_tokens   INTEGER,
                total_tokens      INTEGER,
                is_success        INTEGER,
                status_code       INTEGER,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE INDEX ix_messages_conversation_id ON messages(conversation_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}
