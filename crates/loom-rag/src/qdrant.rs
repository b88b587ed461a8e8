//! Qdrant REST client implementing [`VectorIndex`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::index::{Distance, Point, PointPayload, ScoredPoint, VectorIndex};

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    distance: Distance,
    score_threshold: Option<f32>,
}

#[derive(Serialize)]
struct WirePoint<'a> {
    id: Uuid,
    vector: &'a [f32],
    payload: &'a PointPayload,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<WireHit>,
}

#[derive(Deserialize)]
struct WireHit {
    id: Uuid,
    score: f32,
    payload: PointPayload,
}

impl QdrantIndex {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            distance: Distance::Cosine,
            score_threshold: None,
        })
    }

    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/collections/{}", self.base_url, collection)
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RagError::VectorIndex(format!("{} failed: HTTP {} {}", action, status, body)))
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let url = self.collection_url(collection);

        let existing = self.client.get(&url).send().await?;
        if existing.status().is_success() {
            debug!("Collection {} already exists", collection);
            return Ok(());
        }
        if existing.status() != StatusCode::NOT_FOUND {
            Self::check(existing, "collection lookup").await?;
        }

        let body = json!({
            "vectors": { "size": dimensions, "distance": self.distance.as_str() }
        });
        let response = self.client.put(&url).json(&body).send().await?;
        Self::check(response, "collection create").await?;
        info!("Created collection {} ({} dims, {})", collection, dimensions, self.distance.as_str());
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let wire: Vec<WirePoint<'_>> = points
            .iter()
            .map(|p| WirePoint {
                id: p.id,
                vector: &p.vector,
                payload: &p.payload,
            })
            .collect();

        let url = format!("{}/points?wait=true", self.collection_url(collection));
        let response = self.client.put(&url).json(&json!({ "points": wire })).send().await?;
        Self::check(response, "upsert").await?;
        debug!("Upserted {} point(s) into {}", points.len(), collection);
        Ok(())
    }

    async fn search(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(threshold) = self.score_threshold {
            body["score_threshold"] = json!(threshold);
        }

        let url = format!("{}/points/search", self.collection_url(collection));
        let response = self.client.post(&url).json(&body).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let response = Self::check(response, "search").await?;

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .result
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload,
            })
            .collect())
    }
}
