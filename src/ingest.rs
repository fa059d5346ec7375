//! Offline ingestion pipeline.
//!
//! Coordinates the build flow: corpus → chunking → embedding → index →
//! snapshot. A run is all-or-nothing: any embedding failure aborts it and
//! the snapshot is written only after every chunk has been embedded and
//! inserted, so a partial index never reaches disk.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::corpus;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::RagResult;
use crate::index::VectorIndex;
use crate::models::{Chunk, DocumentChunk, SourceDocument};
use crate::snapshot;

/// Chunking and batching settings for one run.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub max_tokens: usize,
    pub batch_size: usize,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_tokens: config.chunking.max_tokens,
            batch_size: config.embedding.batch_size,
        }
    }
}

/// Counts from a completed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub dims: Option<usize>,
    pub model: String,
    pub path: PathBuf,
}

/// Chunk, embed and index `documents` into a fresh [`VectorIndex`].
///
/// # Errors
///
/// Any embedding failure, or a duplicate chunk id (two documents sharing
/// an id), aborts the whole run.
pub async fn ingest(
    documents: &[SourceDocument],
    max_tokens: usize,
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> RagResult<VectorIndex> {
    let chunks: Vec<(Chunk, Option<&str>)> = documents
        .iter()
        .flat_map(|doc| {
            chunk_text(&doc.id, &doc.body, max_tokens)
                .into_iter()
                .map(move |c| (c, doc.title.as_deref()))
        })
        .collect();

    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        model = provider.model_name(),
        "ingesting corpus"
    );

    let mut index = VectorIndex::with_model(provider.model_name());
    let batch_size = batch_size.max(1);

    for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|(c, _)| c.text.clone()).collect();
        let vectors = embedding::validate_embeddings(
            texts.len(),
            provider.dims(),
            provider.embed_batch(&texts).await?,
        )?;
        debug!(batch = batch_no, size = batch.len(), "embedded batch");

        for ((chunk, title), vector) in batch.iter().zip(vectors) {
            index.insert(to_document_chunk(chunk, *title, vector))?;
        }
    }

    Ok(index)
}

fn to_document_chunk(chunk: &Chunk, title: Option<&str>, vector: Vec<f32>) -> DocumentChunk {
    let mut doc_chunk = DocumentChunk::new(chunk.id.clone(), chunk.text.clone(), vector);
    let metadata = &mut doc_chunk.metadata;
    metadata.insert("document_id".to_string(), json!(chunk.document_id));
    metadata.insert("chunk_index".to_string(), json!(chunk.chunk_index));
    metadata.insert("hash".to_string(), json!(chunk.hash));
    if let Some(title) = title {
        metadata.insert("title".to_string(), json!(title));
    }
    doc_chunk
}

/// Ingest `documents` and write the snapshot to `path`.
///
/// Nothing is written at `path` unless ingestion succeeds completely.
pub async fn build_snapshot(
    documents: &[SourceDocument],
    options: IngestOptions,
    provider: &dyn EmbeddingProvider,
    path: &Path,
) -> RagResult<IngestReport> {
    let index = ingest(documents, options.max_tokens, provider, options.batch_size).await?;
    snapshot::save(&index, path)?;

    Ok(IngestReport {
        documents: documents.len(),
        chunks: index.len(),
        dims: index.dims(),
        model: provider.model_name().to_string(),
        path: path.to_path_buf(),
    })
}

/// CLI driver for `kguide ingest`.
pub async fn run_ingest(config: &Config, dry_run: bool) -> Result<()> {
    let corpus_config = config
        .corpus
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("[corpus] section is required for ingest"))?;

    let documents = corpus::scan_corpus(corpus_config)?;

    if dry_run {
        let total_chunks: usize = documents
            .iter()
            .map(|d| chunk_text(&d.id, &d.body, config.chunking.max_tokens).len())
            .sum();
        println!("ingest (dry-run)");
        println!("  documents found: {}", documents.len());
        println!("  estimated chunks: {}", total_chunks);
        return Ok(());
    }

    if !config.embedding.is_enabled() {
        bail!("Ingest requires embeddings. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let report = build_snapshot(
        &documents,
        IngestOptions::from_config(config),
        provider.as_ref(),
        &config.snapshot.path,
    )
    .await
    .context("ingestion failed; no snapshot was written")?;

    println!("ingest");
    println!("  documents: {}", report.documents);
    println!("  chunks written: {}", report.chunks);
    println!("  model: {}", report.model);
    println!("  dims: {}", report.dims.unwrap_or(0));
    println!("  snapshot: {}", report.path.display());
    println!("ok");

    Ok(())
}
