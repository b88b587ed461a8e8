use std::path::{Path, PathBuf};

use axum::{
    Json,
    extract::{Multipart, State},
};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use loom_rag::extract::{extract_text, text_artifact_path};
use loom_types::api::UploadResponse;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 50 MB upload limit for documents
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

const PDF_CONTENT_TYPE: &str = "application/pdf";

pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_string())
}

async fn save_file(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(path)
}

/// POST /generate/upload. Extraction and indexing run in the background.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        if field.content_type() != Some(PDF_CONTENT_TYPE) {
            return Err(ApiError::invalid("Only uploading PDF documents are supported"));
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let filename = sanitize_filename(&original).ok_or_else(|| ApiError::invalid("Missing file name"))?;
        let bytes = field.bytes().await.map_err(|e| ApiError::invalid(e.body_text()))?;

        let path = save_file(&state.settings.upload_dir, &filename, &bytes)
            .await
            .map_err(|e| ApiError::internal(format!("An error occurred while saving file - Error: {}", e)))?;
        info!("Saved upload {} ({} bytes)", path.display(), bytes.len());

        spawn_ingestion(state.clone(), path);

        return Ok(Json(UploadResponse {
            filename: original,
            message: "File uploaded successfully".to_string(),
        }));
    }

    Err(ApiError::invalid("Missing file field"))
}

fn spawn_ingestion(state: AppState, pdf_path: PathBuf) {
    tokio::spawn(async move {
        if let Err(e) = extract_text(&pdf_path).await {
            error!("Failed to extract text from {}: {}", pdf_path.display(), e);
            return;
        }

        let settings = &state.settings;
        match state
            .ingestor
            .ingest_file(
                &text_artifact_path(&pdf_path),
                settings.chunk_size,
                &settings.collection,
                settings.vector_dim,
            )
            .await
        {
            Ok(stored) => info!("Indexed {} chunk(s) from {}", stored, pdf_path.display()),
            Err(e) => error!("Failed to index {}: {}", pdf_path.display(), e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\docs\\a.pdf").as_deref(), Some("a.pdf"));
    }

    #[test]
    fn sanitize_rejects_empty_names() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }
}
