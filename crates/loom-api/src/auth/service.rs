use std::sync::Arc;

use tracing::{info, warn};

use loom_db::{Database, is_constraint_violation};
use loom_types::api::StatusMessage;
use loom_types::models::{DEFAULT_ROLE, User};

use super::password::{hash_password, verify_password};
use super::token::TokenIssuer;
use crate::error::{ApiError, ApiResult};

pub const MAX_USERNAME_CHARS: usize = 255;
pub const RESET_PASSWORD_MESSAGE: &str =
    "If an account exists, a password reset link will be sent to the provided email";

/// Registration, login, token resolution and logout. Methods block on the
/// database and on Argon2, so async callers run them via `spawn_blocking`.
#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(db: Arc<Database>, tokens: TokenIssuer) -> Self {
        Self { db, tokens }
    }

    pub fn register(&self, username: &str, password: &str) -> ApiResult<User> {
        let len = username.chars().count();
        if len == 0 || len > MAX_USERNAME_CHARS {
            return Err(ApiError::invalid(format!(
                "Username must be between 1 and {} characters",
                MAX_USERNAME_CHARS
            )));
        }
        if password.is_empty() {
            return Err(ApiError::invalid("Password must not be empty"));
        }

        if self.db.get_user_by_username(username)?.is_some() {
            return Err(ApiError::AlreadyRegistered);
        }

        let hashed = hash_password(password)?;
        let row = self.db.create_user(username, &hashed, DEFAULT_ROLE).map_err(|e| {
            // Lost a race with a concurrent registration of the same name.
            if is_constraint_violation(&e) {
                ApiError::AlreadyRegistered
            } else {
                ApiError::from(e)
            }
        })?;

        info!("Registered user {}", row.username);
        Ok(row.into())
    }

    /// Verify credentials and issue an access token. Unknown users and wrong
    /// passwords fail identically.
    pub fn authenticate(&self, username: &str, password: &str, ip_address: Option<&str>) -> ApiResult<String> {
        let Some(row) = self.db.get_user_by_username(username)? else {
            return Err(ApiError::Unauthorized);
        };
        if !verify_password(password, &row.hashed_password) || !row.is_active {
            return Err(ApiError::Unauthorized);
        }

        let expires_at = self.tokens.expiry_from_now();
        let record = self.db.create_token(row.id, expires_at, ip_address)?;
        let user: User = row.into();
        self.tokens.issue(&user, record.id, expires_at)
    }

    pub fn resolve_current_user(&self, token: &str) -> ApiResult<User> {
        if token.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        let claims = self.tokens.decode(token)?;

        let record = self.db.get_token(claims.sub)?.ok_or(ApiError::Unauthorized)?;
        if !record.is_active || record.user_id != claims.user_id {
            return Err(ApiError::Unauthorized);
        }

        let row = self.db.get_user_by_id(claims.user_id)?.ok_or(ApiError::Unauthorized)?;
        if !row.is_active {
            return Err(ApiError::Unauthorized);
        }
        Ok(row.into())
    }

    /// Deactivate the token record behind `token`. Logging out twice is fine.
    pub fn logout(&self, token: &str) -> ApiResult<()> {
        let claims = self.tokens.decode(token)?;
        if !self.db.deactivate_token(claims.sub)? {
            warn!("Token {} was already inactive", claims.sub);
        }
        Ok(())
    }

    pub fn reset_password(&self) -> StatusMessage {
        StatusMessage::new(RESET_PASSWORD_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn service() -> AuthService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        AuthService::new(db, TokenIssuer::new("test-secret", "loom", Duration::minutes(60)))
    }

    #[test]
    fn register_then_login_then_resolve() {
        let auth = service();
        let user = auth.register("ada", "lovelace").unwrap();
        assert_eq!(user.role, "USER");
        assert!(user.is_active);

        let token = auth.authenticate("ada", "lovelace", Some("10.0.0.1")).unwrap();
        let current = auth.resolve_current_user(&token).unwrap();
        assert_eq!(current.id, user.id);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let auth = service();
        auth.register("ada", "one").unwrap();
        assert!(matches!(auth.register("ada", "two"), Err(ApiError::AlreadyRegistered)));
    }

    #[test]
    fn registration_validates_input() {
        let auth = service();
        assert!(matches!(auth.register("", "pw"), Err(ApiError::InvalidArgument(_))));
        assert!(matches!(auth.register("bob", ""), Err(ApiError::InvalidArgument(_))));
        assert!(matches!(
            auth.register(&"x".repeat(MAX_USERNAME_CHARS + 1), "pw"),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn bad_credentials_fail_uniformly() {
        let auth = service();
        auth.register("ada", "lovelace").unwrap();

        let wrong_password = auth.authenticate("ada", "babbage", None).unwrap_err();
        let unknown_user = auth.authenticate("charles", "babbage", None).unwrap_err();
        assert!(matches!(wrong_password, ApiError::Unauthorized));
        assert!(matches!(unknown_user, ApiError::Unauthorized));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn logout_revokes_token() {
        let auth = service();
        auth.register("ada", "lovelace").unwrap();
        let token = auth.authenticate("ada", "lovelace", None).unwrap();

        auth.logout(&token).unwrap();
        assert!(matches!(auth.resolve_current_user(&token), Err(ApiError::Unauthorized)));
        // Idempotent.
        auth.logout(&token).unwrap();
    }

    #[test]
    fn other_sessions_survive_logout() {
        let auth = service();
        auth.register("ada", "lovelace").unwrap();
        let first = auth.authenticate("ada", "lovelace", None).unwrap();
        let second = auth.authenticate("ada", "lovelace", None).unwrap();

        auth.logout(&first).unwrap();
        assert!(auth.resolve_current_user(&second).is_ok());
    }

    #[test]
    fn garbage_tokens_are_unauthorized() {
        let auth = service();
        assert!(matches!(auth.resolve_current_user(""), Err(ApiError::Unauthorized)));
        assert!(matches!(auth.resolve_current_user("abc"), Err(ApiError::Unauthorized)));
        assert!(matches!(auth.logout("abc"), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn reset_password_message_is_constant() {
        assert_eq!(service().reset_password().message, RESET_PASSWORD_MESSAGE);
    }
}
