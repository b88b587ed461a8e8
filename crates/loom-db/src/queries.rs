use crate::Database;
use crate::models::{TOKEN_COLUMNS, TokenRow, USER_COLUMNS, UserRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, hashed_password: &str, role: &str) -> Result<UserRow> {
        self.with_tx(|tx| insert_user(tx, username, hashed_password, role))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Tokens --

    pub fn create_token(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        ip_address: Option<&str>,
    ) -> Result<TokenRow> {
        self.with_tx(|tx| insert_token(tx, user_id, expires_at, ip_address))
    }

    pub fn get_token(&self, id: Uuid) -> Result<Option<TokenRow>> {
        self.with_conn(|conn| query_token(conn, id))
    }

    /// Mark a token inactive. Returns whether an active token was flipped;
    /// unknown or already-inactive tokens are left alone.
    pub fn deactivate_token(&self, id: Uuid) -> Result<bool> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE tokens SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
                rusqlite::params![id, Utc::now()],
            )?;
            Ok(changed > 0)
        })
    }
}

fn insert_user(conn: &Connection, username: &str, hashed_password: &str, role: &str) -> Result<UserRow> {
    let now = Utc::now();
    let row = UserRow {
        id: Uuid::new_v4(),
        username: username.to_string(),
        hashed_password: hashed_password.to_string(),
        is_active: true,
        role: role.to_string(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO users (id, username, hashed_password, is_active, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.id,
            row.username,
            row.hashed_password,
            row.is_active,
            row.role,
            row.created_at,
            row.updated_at
        ],
    )?;

    Ok(row)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS))?;
    stmt.query_row([username], UserRow::from_row).optional()
}

fn query_user_by_id(conn: &Connection, id: Uuid) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))?;
    stmt.query_row([id], UserRow::from_row).optional()
}

fn insert_token(
    conn: &Connection,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    ip_address: Option<&str>,
) -> Result<TokenRow> {
    let now = Utc::now();
    let row = TokenRow {
        id: Uuid::new_v4(),
        user_id,
        expires_at,
        is_active: true,
        ip_address: ip_address.map(str::to_string),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO tokens (id, user_id, expires_at, is_active, ip_address, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.id,
            row.user_id,
            row.expires_at,
            row.is_active,
            row.ip_address,
            row.created_at,
            row.updated_at
        ],
    )?;

    Ok(row)
}

fn query_token(conn: &Connection, id: Uuid) -> Result<Option<TokenRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tokens WHERE id = ?1", TOKEN_COLUMNS))?;
    stmt.query_row([id], TokenRow::from_row).optional()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
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
