use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::files::MAX_UPLOAD_SIZE;
use crate::middleware::monitor_service;
use crate::state::AppState;
use crate::{auth, conversations, files, generate};

/// Every route of the service with request monitoring applied. Transport
/// layers (CORS, tracing) are added by the binary.
pub fn build(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/token", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/me", get(auth::me));

    let conversation_routes = Router::new()
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get_conversation)
                .put(conversations::update_conversation)
                .delete(conversations::delete_conversation),
        )
        .route("/conversations/{id}/messages", get(conversations::list_messages));

    let generate_routes = Router::new()
        .route("/generate/text", post(generate::text))
        .route("/generate/message/{conversation_id}", post(generate::message))
        .route("/generate/audio", get(generate::audio))
        .route("/generate/image", get(generate::image))
        .route("/generate/video", post(generate::video))
        .route("/generate/upload", post(files::upload));

    Router::new()
        .merge(auth_routes)
        .merge(conversation_routes)
        .merge(generate_routes)
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(middleware::from_fn_with_state(state.clone(), monitor_service))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
