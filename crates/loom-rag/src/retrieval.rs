use std::sync::Arc;

use tracing::debug;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, collection: impl Into<String>) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    /// Top `top_k` chunk texts with their scores, best first. Empty when the
    /// collection is empty or missing.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.search(&self.collection, &vector, top_k).await?;
        debug!("Retrieved {} chunk(s) from {}", hits.len(), self.collection);

        Ok(hits.into_iter().map(|h| (h.payload.text, h.score)).collect())
    }

    /// Retrieved texts joined by newlines, appended after the prompt.
    pub async fn context(&self, query: &str, top_k: usize) -> Result<String> {
        let hits = self.retrieve(query, top_k).await?;
        Ok(hits.into_iter().map(|(text, _)| text).collect::<Vec<_>>().join("\n"))
    }
}
