use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

/// Longest accepted token lifetime: one year.
const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Runtime configuration, read from `LOOM_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_minutes: i64,
    pub upload_dir: PathBuf,
    pub usage_log: PathBuf,
    pub ollama_url: String,
    pub inference_url: String,
    pub qdrant_url: String,
    pub embedding_model: String,
    pub vector_dim: usize,
    pub collection: String,
    pub chunk_size: i64,
    pub rag_top_k: usize,
    pub score_threshold: Option<f32>,
    pub request_timeout: Duration,
    pub scrape_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("LOOM_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("LOOM_JWT_SECRET is unset or still a placeholder");
        }

        let token_ttl_minutes: i64 = var("LOOM_TOKEN_TTL_MINUTES", "60")
            .parse()
            .context("LOOM_TOKEN_TTL_MINUTES must be an integer")?;
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes) {
            bail!("LOOM_TOKEN_TTL_MINUTES must be between 1 and {}", MAX_TOKEN_TTL_MINUTES);
        }

        let score_threshold: Option<f32> = match lookup("LOOM_SCORE_THRESHOLD") {
            Some(v) if !v.trim().is_empty() => {
                Some(v.trim().parse().context("LOOM_SCORE_THRESHOLD must be a number")?)
            }
            _ => None,
        };

        let chunk_size: i64 = var("LOOM_CHUNK_SIZE", "512")
            .parse()
            .context("LOOM_CHUNK_SIZE must be an integer")?;
        if chunk_size <= 0 {
            bail!("LOOM_CHUNK_SIZE must be positive");
        }

        Ok(Self {
            host: var("LOOM_HOST", "0.0.0.0"),
            port: var("LOOM_PORT", "8000").parse().context("LOOM_PORT must be a port number")?,
            db_path: var("LOOM_DB_PATH", "loom.db").into(),
            jwt_secret,
            jwt_issuer: var("LOOM_JWT_ISSUER", "loom"),
            token_ttl_minutes,
            upload_dir: var("LOOM_UPLOAD_DIR", "uploads").into(),
            usage_log: var("LOOM_USAGE_LOG", "usage.csv").into(),
            ollama_url: var("LOOM_OLLAMA_URL", "http://localhost:11434"),
            inference_url: var("LOOM_INFERENCE_URL", "http://localhost:8001"),
            qdrant_url: var("LOOM_QDRANT_URL", "http://localhost:6333"),
            embedding_model: var("LOOM_EMBEDDING_MODEL", "nomic-embed-text"),
            vector_dim: var("LOOM_VECTOR_DIM", "768")
                .parse()
                .context("LOOM_VECTOR_DIM must be an integer")?,
            collection: var("LOOM_COLLECTION", "knowledgebase"),
            chunk_size,
            rag_top_k: var("LOOM_RAG_TOP_K", "3").parse().context("LOOM_RAG_TOP_K must be an integer")?,
            score_threshold,
            request_timeout: Duration::from_secs(
                var("LOOM_REQUEST_TIMEOUT_SECS", "120")
                    .parse()
                    .context("LOOM_REQUEST_TIMEOUT_SECS must be an integer")?,
            ),
            scrape_timeout: Duration::from_secs(
                var("LOOM_SCRAPE_TIMEOUT_SECS", "10")
                    .parse()
                    .context("LOOM_SCRAPE_TIMEOUT_SECS must be an integer")?,
            ),
        })
    }
}
