use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::chunk::{TextChunk, chunk_text};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::{Point, PointPayload, VectorIndex};

/// Chunks, embeds and stores documents in a vector index.
#[derive(Clone)]
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    pub async fn embed(&self, chunk: &TextChunk) -> Result<Vec<f32>> {
        self.embedder.embed(&chunk.text).await
    }

    /// Upsert one point per chunk into `collection`, creating it first if
    /// needed. Every point gets a fresh id, so storing the same document
    /// twice leaves two copies in the index.
    pub async fn store(
        &self,
        document_label: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
        collection: &str,
        vector_dim: usize,
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::invalid(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some((i, v)) = embeddings.iter().enumerate().find(|(_, v)| v.len() != vector_dim) {
            return Err(RagError::invalid(format!(
                "embedding {} has dimension {}, expected {}",
                i,
                v.len(),
                vector_dim
            )));
        }

        self.index.ensure_collection(collection, vector_dim).await?;

        let points: Vec<Point> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| Point {
                id: Uuid::new_v4(),
                vector: vector.clone(),
                payload: PointPayload {
                    doc: document_label.to_string(),
                    text: chunk.text.clone(),
                    chunk_index: chunk.index,
                },
            })
            .collect();

        self.index.upsert(collection, &points).await?;
        Ok(points.len())
    }

    /// Returns the number of stored chunks.
    pub async fn ingest_file(
        &self,
        text_path: &Path,
        chunk_size: i64,
        collection: &str,
        vector_dim: usize,
    ) -> Result<usize> {
        let content = tokio::fs::read_to_string(text_path).await?;
        let chunks = chunk_text(&content, chunk_size)?;
        if chunks.is_empty() {
            warn!("No text to ingest in {}", text_path.display());
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let label = text_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| text_path.display().to_string());

        let stored = self.store(&label, &chunks, &embeddings, collection, vector_dim).await?;
        info!(
            "Ingested {} chunk(s) from {} into {} using {}",
            stored,
            label,
            collection,
            self.embedder.name()
        );
        Ok(stored)
    }
}
