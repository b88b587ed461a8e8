use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use loom_db::Database;
use loom_inference::Generator;
use loom_rag::{Ingestor, Retriever, UrlEnricher};

use crate::auth::AuthService;
use crate::error::{ApiError, ApiResult};
use crate::middleware::UsageLog;

pub type AppState = Arc<AppContext>;

#[derive(Debug, Clone)]
pub struct Settings {
    pub upload_dir: PathBuf,
    pub chunk_size: i64,
    pub collection: String,
    pub vector_dim: usize,
    pub rag_top_k: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            chunk_size: 512,
            collection: "knowledgebase".to_string(),
            vector_dim: 768,
            rag_top_k: 3,
        }
    }
}

/// Everything a handler needs, built once at startup.
pub struct AppContext {
    pub db: Arc<Database>,
    pub auth: AuthService,
    pub generator: Generator,
    pub ingestor: Ingestor,
    pub retriever: Retriever,
    pub enricher: UrlEnricher,
    pub usage_log: UsageLog,
    pub settings: Settings,
}

impl AppContext {
    pub async fn db<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::from(e)
            })?
            .map_err(ApiError::from)
    }

    /// Run a blocking auth operation (Argon2 + database) off the async runtime.
    pub async fn auth<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&AuthService) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let auth = self.auth.clone();
        tokio::task::spawn_blocking(move || f(&auth)).await?
    }
}
