mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use loom_api::auth::{AuthService, TokenIssuer};
use loom_api::middleware::UsageLog;
use loom_api::{AppContext, AppState, Settings};
use loom_db::Database;
use loom_inference::{Generator, ModelRegistry, RemoteLoader};
use loom_rag::{Embedder, Ingestor, OllamaEmbedder, QdrantIndex, Retriever, UrlEnricher, VectorIndex};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loom=debug,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let state = build_state(&config)?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let app = loom_api::router::build(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Loom server listening on {}", addr);
    info!(
        "Inference at {}, models at {}, vectors at {} ({})",
        config.inference_url, config.ollama_url, config.qdrant_url, config.collection
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db = Arc::new(Database::open(&config.db_path)?);

    let tokens = TokenIssuer::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        chrono::Duration::minutes(config.token_ttl_minutes),
    );
    let auth = AuthService::new(db.clone(), tokens);

    let loader = RemoteLoader::new(&config.ollama_url, &config.inference_url, config.request_timeout)?;
    let generator = Generator::new(Arc::new(ModelRegistry::new(Arc::new(loader))));

    let embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
        config.ollama_url.clone(),
        config.embedding_model.clone(),
        config.vector_dim,
        config.request_timeout,
    )?);
    let index: Arc<dyn VectorIndex> = Arc::new(
        QdrantIndex::new(config.qdrant_url.clone(), config.request_timeout)?
            .with_score_threshold(config.score_threshold),
    );

    let settings = Settings {
        upload_dir: config.upload_dir.clone(),
        chunk_size: config.chunk_size,
        collection: config.collection.clone(),
        vector_dim: config.vector_dim,
        rag_top_k: config.rag_top_k,
    };

    Ok(Arc::new(AppContext {
        db,
        auth,
        generator,
        ingestor: Ingestor::new(embedder.clone(), index.clone()),
        retriever: Retriever::new(embedder, index, config.collection.clone()),
        enricher: UrlEnricher::new(config.scrape_timeout)?,
        usage_log: UsageLog::new(config.usage_log.clone()),
        settings,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
