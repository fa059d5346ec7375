//! In-memory vector index with exact cosine search.
//!
//! The index holds a small, static corpus (tens to hundreds of chunks), so
//! search is a brute-force scan over every stored vector. It is built once
//! by ingestion, written to a snapshot, and after loading is shared
//! read-only (typically behind `Arc`); nothing mutates it while serving.
//!
//! # Invariants
//!
//! - Chunk ids are unique.
//! - Every vector has the same, non-zero length. The first insert fixes it.
//! - Search order depends only on score; equal scores keep insertion order.

use std::collections::HashMap;

use crate::embedding::cosine_similarity;
use crate::error::{RagError, RagResult};
use crate::models::{DocumentChunk, SearchHit};
use crate::snapshot;

#[derive(Debug, Default)]
pub struct VectorIndex {
    model: Option<String>,
    dims: Option<usize>,
    chunks: Vec<DocumentChunk>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index tagged with the embedding model that will fill it.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Add a chunk. Used only while ingesting.
    ///
    /// # Errors
    ///
    /// - [`RagError::DuplicateId`] if `chunk.id` is already present.
    /// - [`RagError::InvalidChunk`] if the vector is empty.
    /// - [`RagError::DimensionMismatch`] if the vector length differs from
    ///   the vectors already stored.
    pub fn insert(&mut self, chunk: DocumentChunk) -> RagResult<()> {
        if self.positions.contains_key(&chunk.id) {
            return Err(RagError::DuplicateId(chunk.id));
        }
        if chunk.vector.is_empty() {
            return Err(RagError::InvalidChunk {
                id: chunk.id,
                reason: "empty vector".to_string(),
            });
        }
        match self.dims {
            Some(dims) if dims != chunk.vector.len() => {
                return Err(RagError::DimensionMismatch {
                    expected: dims,
                    actual: chunk.vector.len(),
                });
            }
            Some(_) => {}
            None => self.dims = Some(chunk.vector.len()),
        }

        self.positions.insert(chunk.id.clone(), self.chunks.len());
        self.chunks.push(chunk);
        Ok(())
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// An empty index yields an empty result regardless of the query.
    ///
    /// # Errors
    ///
    /// [`RagError::DimensionMismatch`] if `query.len()` differs from the
    /// index dimensionality.
    pub fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<SearchHit<'_>>> {
        let dims = match self.dims {
            Some(dims) if !self.chunks.is_empty() => dims,
            _ => return Ok(Vec::new()),
        };
        if query.len() != dims {
            return Err(RagError::DimensionMismatch {
                expected: dims,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit<'_>> = self
            .chunks
            .iter()
            .map(|chunk| SearchHit {
                chunk,
                score: cosine_similarity(query, &chunk.vector),
            })
            .collect();

        // Vec::sort_by is stable: equal scores stay in insertion order.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    pub fn get(&self, id: &str) -> Option<&DocumentChunk> {
        self.positions.get(id).map(|&i| &self.chunks[i])
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector length shared by every chunk; `None` until the first insert.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    /// Embedding model the vectors were produced with, if recorded.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub(crate) fn set_dims(&mut self, dims: usize) {
        self.dims = Some(dims);
    }

    /// Encode the index as a versioned snapshot blob.
    ///
    /// The blob holds ids, texts, vectors and metadata only; no provider
    /// or credential is ever part of it.
    pub fn serialize(&self) -> RagResult<Vec<u8>> {
        snapshot::encode(self)
    }

    /// Decode a blob produced by [`serialize`](Self::serialize).
    ///
    /// The returned index has no embedding provider attached; callers bind
    /// a freshly constructed one.
    pub fn deserialize(blob: &[u8]) -> RagResult<Self> {
        snapshot::decode(blob)
    }
}
