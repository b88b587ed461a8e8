use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use loom_types::api::{ConversationRequest, ListQuery};
use loom_types::models::{Conversation, Message};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NOT_FOUND: &str = "Conversation not found";

pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Conversation>>> {
    let rows = state
        .db(move |db| db.list_conversations(query.skip, query.take))
        .await?;
    Ok(Json(rows.into_iter().map(Conversation::from).collect()))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Conversation>> {
    let row = state
        .db(move |db| db.get_conversation(id))
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(row.into()))
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<ConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db(move |db| db.create_conversation(&req.title, &req.model_type))
        .await?;
    Ok((StatusCode::CREATED, Json(Conversation::from(row))))
}

pub async fn update_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let row = state
        .db(move |db| db.update_conversation(id, &req.title, &req.model_type))
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok((StatusCode::ACCEPTED, Json(Conversation::from(row))))
}

pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db(move |db| db.delete_conversation(id)).await? {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Message>>> {
    let rows = state
        .db(move |db| {
            if db.get_conversation(id)?.is_none() {
                return Ok(None);
            }
            db.list_messages(id).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
    Ok(Json(rows.into_iter().map(Message::from).collect()))
}
