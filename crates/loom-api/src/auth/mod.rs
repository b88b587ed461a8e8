//! Authentication: password hashing, access tokens and the `/auth` routes.

mod password;
mod service;
mod token;

pub use password::{hash_password, verify_password};
pub use service::{AuthService, MAX_USERNAME_CHARS, RESET_PASSWORD_MESSAGE};
pub use token::TokenIssuer;

use axum::{
    Form, Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use loom_types::api::{LoginForm, RegisterRequest, StatusMessage, TokenResponse};
use loom_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Raw bearer credential from the `Authorization` header. Any other scheme,
/// or no header at all, is rejected as unauthorized.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let token = bearer.token().trim();
        if token.is_empty() {
            return Err(ApiError::Unauthorized);
        }
        Ok(BearerToken(token.to_string()))
    }
}

pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.auth(move |auth| auth.resolve_current_user(&token)).await?;
        Ok(CurrentUser(user))
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .auth(move |auth| auth.register(&req.username, &req.password))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// OAuth2 password flow.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<TokenResponse>> {
    let access_token = state
        .auth(move |auth| auth.authenticate(&form.username, &form.password, ip.as_deref()))
        .await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<StatusMessage>> {
    state.auth(move |auth| auth.logout(&token)).await?;
    Ok(Json(StatusMessage::new("Logged out")))
}

pub async fn reset_password(State(state): State<AppState>) -> Json<StatusMessage> {
    Json(state.auth.reset_password())
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
