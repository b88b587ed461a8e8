//! Vector index contract and an in-process implementation.
//!
//! Production deployments talk to Qdrant (see [`crate::qdrant`]); the
//! in-memory index answers the same calls with brute-force cosine search and
//! backs tests and offline runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distance::Cosine => "Cosine",
            Distance::Dot => "Dot",
            Distance::Euclid => "Euclid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub doc: String,
    pub text: String,
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct Point {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: PointPayload,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
    pub payload: PointPayload,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create `collection` with vectors of `dimensions` unless it already exists.
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()>;

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()>;

    /// Nearest neighbours of `vector`, best first. A missing collection
    /// searches as empty.
    async fn search(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredPoint>>;
}

struct Collection {
    dimensions: usize,
    points: HashMap<Uuid, Point>,
}

/// Brute-force cosine index held in memory.
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
    score_threshold: Option<f32>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            score_threshold: None,
        }
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Number of points in `collection`, 0 when it does not exist.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> RagError {
    RagError::VectorIndex("index lock poisoned".to_string())
}

pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self, collection: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        match collections.get(collection) {
            Some(existing) if existing.dimensions != dimensions => Err(RagError::invalid(format!(
                "collection {} has dimension {}, requested {}",
                collection, existing.dimensions, dimensions
            ))),
            Some(_) => Ok(()),
            None => {
                collections.insert(
                    collection.to_string(),
                    Collection {
                        dimensions,
                        points: HashMap::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| poisoned())?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| RagError::VectorIndex(format!("collection {} does not exist", collection)))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimensions) {
            return Err(RagError::invalid(format!(
                "point {} has dimension {}, collection expects {}",
                bad.id,
                bad.vector.len(),
                target.dimensions
            )));
        }

        for point in points {
            target.points.insert(point.id, point.clone());
        }
        Ok(())
    }

    async fn search(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().map_err(|_| poisoned())?;
        let Some(target) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredPoint> = target
            .points
            .values()
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_sim(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|p| self.score_threshold.is_none_or(|t| p.score >= t))
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
