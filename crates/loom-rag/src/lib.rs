//! Document ingestion and retrieval for retrieval-augmented generation.
//!
//! Uploaded PDFs are turned into text artifacts, split into fixed-size token
//! windows, embedded and upserted into an external vector index. Queries are
//! embedded with the same model and answered by nearest-neighbour search.

pub mod chunk;
pub mod embedding;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod index;
pub mod pipeline;
pub mod qdrant;
pub mod retrieval;

pub use chunk::{TextChunk, chunk, chunk_text, count_tokens, tokenize};
pub use embedding::{Embedder, OllamaEmbedder};
pub use enrich::UrlEnricher;
pub use error::{RagError, Result};
pub use index::{Distance, MemoryIndex, Point, PointPayload, ScoredPoint, VectorIndex};
pub use pipeline::Ingestor;
pub use qdrant::QdrantIndex;
pub use retrieval::Retriever;
