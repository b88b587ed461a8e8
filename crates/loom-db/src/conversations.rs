use crate::Database;
use crate::models::{CONVERSATION_COLUMNS, ConversationRow, MESSAGE_COLUMNS, MessageRow, NewMessage};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

impl Database {
    // -- Conversations --

    pub fn list_conversations(&self, skip: u32, take: u32) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM conversations ORDER BY id LIMIT ?1 OFFSET ?2",
                CONVERSATION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![take, skip], ConversationRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_conversation(&self, id: i64) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    pub fn create_conversation(&self, title: &str, model_type: &str) -> Result<ConversationRow> {
        self.with_tx(|tx| {
            let now = Utc::now();
            tx.execute(
                "INSERT INTO conversations (title, model_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                rusqlite::params![title, model_type, now],
            )?;
            Ok(ConversationRow {
                id: tx.last_insert_rowid(),
                title: title.to_string(),
                model_type: model_type.to_string(),
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Replace every user-editable field. `None` when the conversation does not exist.
    pub fn update_conversation(
        &self,
        id: i64,
        title: &str,
        model_type: &str,
    ) -> Result<Option<ConversationRow>> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE conversations SET title = ?2, model_type = ?3, updated_at = ?4 WHERE id = ?1",
                rusqlite::params![id, title, model_type, Utc::now()],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_conversation(tx, id)
        })
    }

    /// Delete a conversation; its messages go with it through the FK cascade.
    /// Returns false when nothing was deleted.
    pub fn delete_conversation(&self, id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            let changed = tx.execute("DELETE FROM conversations WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Messages --

    pub fn create_message(&self, message: &NewMessage) -> Result<MessageRow> {
        self.with_tx(|tx| {
            let now = Utc::now();
            tx.execute(
                "INSERT INTO messages (conversation_id, prompt_content, response_content,
                     prompt_tokens, response_tokens, total_tokens, is_success, status_code,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    message.conversation_id,
                    message.prompt_content,
                    message.response_content,
                    message.prompt_tokens,
                    message.response_tokens,
                    message.total_tokens,
                    message.is_success,
                    message.status_code,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let mut stmt = tx.prepare(&format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS))?;
            let row = stmt.query_row([id], MessageRow::from_row)?;
            Ok(row)
        })
    }

    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages WHERE conversation_id = ?1 ORDER BY id",
                MESSAGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([conversation_id], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_conversation(conn: &Connection, id: i64) -> Result<Option<ConversationRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM conversations WHERE id = ?1", CONVERSATION_COLUMNS))?;
    stmt.query_row([id], ConversationRow::from_row).optional()
}
