//! Database row types. These map directly to SQLite rows.
//! Distinct from loom-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use loom_types::models::{Conversation, Message, User};

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct TokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ConversationRow {
    pub id: i64,
    pub title: String,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub prompt_content: String,
    pub response_content: String,
    pub prompt_tokens: Option<i64>,
    pub response_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub is_success: Option<bool>,
    pub status_code: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when appending a message.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub conversation_id: i64,
    pub prompt_content: String,
    pub response_content: String,
    pub prompt_tokens: Option<i64>,
    pub response_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub is_success: Option<bool>,
    pub status_code: Option<i64>,
}

pub(crate) const USER_COLUMNS: &str =
    "id, username, hashed_password, is_active, role, created_at, updated_at";
pub(crate) const TOKEN_COLUMNS: &str =
    "id, user_id, expires_at, is_active, ip_address, created_at, updated_at";
pub(crate) const CONVERSATION_COLUMNS: &str = "id, title, model_type, created_at, updated_at";
pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, prompt_content, response_content, \
     prompt_tokens, response_tokens, total_tokens, is_success, status_code, created_at, updated_at";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            hashed_password: row.get(2)?,
            is_active: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl TokenRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            expires_at: row.get(2)?,
            is_active: row.get(3)?,
            ip_address: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl ConversationRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            model_type: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            prompt_content: row.get(2)?,
            response_content: row.get(3)?,
            prompt_tokens: row.get(4)?,
            response_tokens: row.get(5)?,
            total_tokens: row.get(6)?,
            is_success: row.get(7)?,
            status_code: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            is_active: row.is_active,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            model_type: row.model_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            prompt_content: row.prompt_content,
            response_content: row.response_content,
            prompt_tokens: row.prompt_tokens,
            response_tokens: row.response_tokens,
            total_tokens: row.total_tokens,
            status_code: row.status_code,
            is_success: row.is_success,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
