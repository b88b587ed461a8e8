use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims carried by an access token. `sub` is the id of the persisted
/// token record, not the user, so a token can be revoked server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub exp: usize,
    pub iss: String,
    pub sub: Uuid,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// OAuth2 password-flow form. Extra form fields (grant_type, scope, ...)
/// are accepted and ignored.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

// -- Conversations --

/// Body for both create and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationRequest {
    pub title: String,
    pub model_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: u32,
    #[serde(default = "default_take")]
    pub take: u32,
}

fn default_take() -> u32 {
    100
}

// -- Generation --

#[derive(Debug, Deserialize)]
pub struct TextModelRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextModelResponse {
    pub request_id: String,
    pub ip: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub temperature: f32,
    pub tokens: usize,
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioQuery {
    pub prompt: String,
    #[serde(default = "default_preset")]
    pub preset: String,
}

fn default_preset() -> String {
    "v2/en_speaker_1".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub prompt: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_side")]
    pub width: u32,
    #[serde(default = "default_image_side")]
    pub height: u32,
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,
}

fn default_image_model() -> String {
    "tinysd".to_string()
}

fn default_image_side() -> u32 {
    512
}

fn default_inference_steps() -> u32 {
    200
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub message: String,
}
