use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use loom_db::models::NewMessage;
use loom_inference::TextModel;
use loom_rag::count_tokens;
use loom_types::api::{AudioQuery, ImageQuery, PromptQuery, TextModelRequest, TextModelResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientIp;
use crate::state::AppState;

const MESSAGE_TEMPERATURE: f32 = 0.01;
const DEFAULT_NUM_FRAMES: u32 = 25;

// URL text, then retrieved chunks. Retrieval failures degrade to no context.
async fn prompt_context(state: &AppState, prompt: &str) -> String {
    let urls_content = state.enricher.enrich(prompt).await;
    let rag_content = match state.retriever.context(prompt, state.settings.rag_top_k).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Retrieval failed, continuing without context: {}", e);
            String::new()
        }
    };
    format!("{}{}", urls_content, rag_content)
}

fn text_response(ip: Option<String>, model: TextModel, temperature: f32, content: String) -> TextModelResponse {
    let tokens = count_tokens(&content);
    TextModelResponse {
        request_id: Uuid::new_v4().simple().to_string(),
        ip,
        created_at: Utc::now(),
        model: model.as_str().to_string(),
        temperature,
        tokens,
        cost: model.cost(tokens),
        content,
    }
}

pub async fn text(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(body): Json<TextModelRequest>,
) -> ApiResult<Json<TextModelResponse>> {
    let model: TextModel = body.model.parse()?;
    let context = prompt_context(&state, &body.prompt).await;

    let output = state
        .generator
        .text(model.as_str(), &body.prompt, &context, body.temperature)
        .await?;

    let res = text_response(ip, output.model, body.temperature, output.content);
    info!("Generated {} token(s) with {} for {}", res.tokens, res.model, res.request_id);
    Ok(Json(res))
}

/// POST /generate/message/{conversation_id}. The exchange is stored after
/// the response has been built.
pub async fn message(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Path(conversation_id): Path<i64>,
    Query(query): Query<PromptQuery>,
) -> ApiResult<Json<TextModelResponse>> {
    state
        .db(move |db| db.get_conversation(conversation_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Conversation not found"))?;

    let model = TextModel::TinyLlama;
    let output = state
        .generator
        .text(model.as_str(), &query.prompt, "", MESSAGE_TEMPERATURE)
        .await?;
    let res = text_response(ip, model, MESSAGE_TEMPERATURE, output.content);

    let prompt_tokens = count_tokens(&query.prompt) as i64;
    let response_tokens = res.tokens as i64;
    let message = NewMessage {
        conversation_id,
        prompt_content: query.prompt,
        response_content: res.content.clone(),
        prompt_tokens: Some(prompt_tokens),
        response_tokens: Some(response_tokens),
        total_tokens: Some(prompt_tokens + response_tokens),
        is_success: Some(true),
        status_code: Some(200),
    };
    let db = state.db.clone();
    tokio::spawn(async move {
        match tokio::task::spawn_blocking(move || db.create_message(&message)).await {
            Ok(Ok(row)) => info!("Stored message {} in conversation {}", row.id, row.conversation_id),
            Ok(Err(e)) => error!("Failed to store message: {:#}", e),
            Err(e) => error!("spawn_blocking join error: {}", e),
        }
    });

    Ok(Json(res))
}

pub async fn audio(State(state): State<AppState>, Query(query): Query<AudioQuery>) -> ApiResult<impl IntoResponse> {
    let wav = state.generator.audio(&query.prompt, &query.preset).await?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], wav))
}

pub async fn image(State(state): State<AppState>, Query(query): Query<ImageQuery>) -> ApiResult<impl IntoResponse> {
    let png = state
        .generator
        .image(
            &query.prompt,
            &query.model,
            query.width,
            query.height,
            query.num_inference_steps,
        )
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// POST /generate/video: multipart `image` file plus optional `num_frames`.
pub async fn video(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let mut image = None;
    let mut num_frames = DEFAULT_NUM_FRAMES;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") => {
                image = Some(field.bytes().await.map_err(|e| ApiError::invalid(e.body_text()))?);
            }
            Some("num_frames") => {
                let raw = field.text().await.map_err(|e| ApiError::invalid(e.body_text()))?;
                num_frames = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::invalid("num_frames must be a positive integer"))?;
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::invalid("Missing image field"))?;
    let mp4 = state.generator.video(&image, num_frames).await?;
    Ok(([(header::CONTENT_TYPE, "video/mp4")], mp4))
}
