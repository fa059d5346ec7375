//! Core data models used throughout the retrieval engine.
//!
//! These types represent the documents and chunks that flow through the
//! offline ingestion pipeline and the query-time search path.

use std::collections::BTreeMap;

/// Raw document handed to ingestion before chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub id: String,
    pub title: Option<String>,
    pub body: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            body: body.into(),
        }
    }
}

/// A bounded slice of a document's body, before embedding.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// An embedded chunk as held by the [`VectorIndex`](crate::index::VectorIndex).
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DocumentChunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            vector,
            metadata: BTreeMap::new(),
        }
    }

    /// The `document_id` metadata entry, if ingestion recorded one.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get("document_id").and_then(|v| v.as_str())
    }
}

/// A ranked match returned from [`VectorIndex::search`](crate::index::VectorIndex::search).
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub chunk: &'a DocumentChunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}
