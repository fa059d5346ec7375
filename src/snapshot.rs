//! Versioned on-disk snapshot of a [`VectorIndex`].
//!
//! # Format (version 1)
//!
//! A JSON document:
//!
//! ```json
//! {
//!   "format": "korea-guide-rag/snapshot",
//!   "version": 1,
//!   "created_at": "2026-10-19T08:00:00Z",
//!   "model": "text-embedding-3-small",
//!   "dims": 1536,
//!   "checksum": "<sha256 hex>",
//!   "chunks": [
//!     { "id": "…", "text": "…", "vector": "<base64 of LE f32 bytes>", "metadata": {} }
//!   ]
//! }
//! ```
//!
//! Vectors are stored as base64-encoded little-endian `f32` bytes so they
//! round-trip bit-for-bit. The checksum covers every chunk's id, text,
//! vector bytes and metadata, in order. Credentials are never written.
//!
//! [`save`] writes a temp file next to the target and renames it into
//! place, so a concurrent reader sees either the old file or the new one.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{RagError, RagResult};
use crate::index::VectorIndex;
use crate::models::DocumentChunk;

pub const FORMAT_TAG: &str = "korea-guide-rag/snapshot";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    format: String,
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    dims: Option<usize>,
    checksum: String,
    chunks: Vec<ChunkRecord>,
}

#[derive(Serialize, Deserialize)]
struct ChunkRecord {
    id: String,
    text: String,
    vector: String,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

/// Summary of a snapshot, for display.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub chunk_count: usize,
}

pub(crate) fn encode(index: &VectorIndex) -> RagResult<Vec<u8>> {
    let file = SnapshotFile {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        created_at: Utc::now(),
        model: index.model().map(str::to_string),
        dims: index.dims(),
        checksum: checksum(index.chunks()),
        chunks: index
            .chunks()
            .iter()
            .map(|c| ChunkRecord {
                id: c.id.clone(),
                text: c.text.clone(),
                vector: STANDARD.encode(vec_to_blob(&c.vector)),
                metadata: c.metadata.clone(),
            })
            .collect(),
    };
    serde_json::to_vec(&file).map_err(|e| RagError::Snapshot(e.to_string()))
}

pub(crate) fn decode(blob: &[u8]) -> RagResult<VectorIndex> {
    let file = parse(blob)?;

    let mut index = match file.model {
        Some(model) => VectorIndex::with_model(model),
        None => VectorIndex::new(),
    };
    if let Some(dims) = file.dims {
        index.set_dims(dims);
    }

    let mut chunks = Vec::with_capacity(file.chunks.len());
    for record in file.chunks {
        let bytes = STANDARD.decode(&record.vector).map_err(|e| {
            RagError::Snapshot(format!("chunk '{}': invalid vector encoding: {}", record.id, e))
        })?;
        if bytes.len() % 4 != 0 {
            return Err(RagError::Snapshot(format!(
                "chunk '{}': vector byte length {} is not a multiple of 4",
                record.id,
                bytes.len()
            )));
        }
        chunks.push(DocumentChunk {
            id: record.id,
            text: record.text,
            vector: blob_to_vec(&bytes),
            metadata: record.metadata,
        });
    }

    let expected = checksum(&chunks);
    if expected != file.checksum {
        return Err(RagError::Snapshot(format!(
            "checksum mismatch: file says {}, contents hash to {}",
            file.checksum, expected
        )));
    }

    for chunk in chunks {
        index
            .insert(chunk)
            .map_err(|e| RagError::Snapshot(format!("invalid snapshot contents: {}", e)))?;
    }

    Ok(index)
}

fn parse(blob: &[u8]) -> RagResult<SnapshotFile> {
    let file: SnapshotFile = serde_json::from_slice(blob)
        .map_err(|e| RagError::Snapshot(format!("unreadable snapshot: {}", e)))?;
    if file.format != FORMAT_TAG {
        return Err(RagError::Snapshot(format!(
            "unexpected format tag '{}'",
            file.format
        )));
    }
    if file.version != FORMAT_VERSION {
        return Err(RagError::Snapshot(format!(
            "unsupported snapshot version {} (expected {})",
            file.version, FORMAT_VERSION
        )));
    }
    Ok(file)
}

fn checksum(chunks: &[DocumentChunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.text.as_bytes());
        hasher.update([0u8]);
        hasher.update(vec_to_blob(&chunk.vector));
        hasher.update([0u8]);
        // Stable: BTreeMap keys serialize in order and floats parse exactly (float_roundtrip).
        hasher.update(serde_json::to_string(&chunk.metadata).unwrap_or_default());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Atomically write `index` to `path`, creating parent directories.
pub fn save(index: &VectorIndex, path: &Path) -> RagResult<()> {
    let blob = index.serialize()?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&blob)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| RagError::Io(e.error))?;

    info!(
        path = %path.display(),
        chunks = index.len(),
        bytes = blob.len(),
        "snapshot written"
    );
    Ok(())
}

/// Read and decode the snapshot at `path`.
pub fn load(path: &Path) -> RagResult<VectorIndex> {
    let blob = std::fs::read(path)?;
    VectorIndex::deserialize(&blob)
}

/// Read only the header fields of the snapshot at `path`.
pub fn inspect(path: &Path) -> RagResult<SnapshotInfo> {
    let blob = std::fs::read(path)?;
    let file = parse(&blob)?;
    Ok(SnapshotInfo {
        version: file.version,
        created_at: file.created_at,
        model: file.model,
        dims: file.dims,
        chunk_count: file.chunks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::with_model("test-model");
        let mut first = DocumentChunk::new(
            "c1",
            "Hospitals open 9-6",
            vec![0.1, -0.2, f32::MIN_POSITIVE],
        );
        first
            .metadata
            .insert("document_id".to_string(), serde_json::json!("health.md"));
        first
            .metadata
            .insert("chunk_index".to_string(), serde_json::json!(0));
        index.insert(first).unwrap();
        index
            .insert(DocumentChunk::new(
                "c2",
                "지하철 요금은 1400원",
                vec![1.0 / 3.0, 0.0, -7.5e-8],
            ))
            .unwrap();
        index
    }

    #[test]
    fn test_roundtrip_preserves_everything() {
        let index = sample_index();
        let blob = index.serialize().unwrap();
        let restored = VectorIndex::deserialize(&blob).unwrap();

        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.dims(), Some(3));
        assert_eq!(restored.model(), Some("test-model"));
        for (a, b) in index.chunks().iter().zip(restored.chunks()) {
            assert_eq!(a, b);
            let bits_a: Vec<u32> = a.vector.iter().map(|x| x.to_bits()).collect();
            let bits_b: Vec<u32> = b.vector.iter().map(|x| x.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }

    #[test]
    fn test_float_metadata_roundtrip() {
        let mut values = vec![
            8.597941207808163e-21,
            1.0 / 3.0,
            -2.2250738585072014e-308,
            5e-324,
            f64::MAX,
            0.1 + 0.2,
        ];
        // Deterministic spread of f64 bit patterns across the finite range.
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        while values.len() < 500 {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let value = f64::from_bits(state);
            if value.is_finite() {
                values.push(value);
            }
        }

        let mut index = VectorIndex::with_model("test-model");
        for (i, value) in values.iter().enumerate() {
            let mut chunk = DocumentChunk::new(format!("c{}", i), "text", vec![1.0, 0.0]);
            chunk
                .metadata
                .insert("score".to_string(), serde_json::json!(value));
            index.insert(chunk).unwrap();
        }

        let restored = VectorIndex::deserialize(&index.serialize().unwrap()).unwrap();
        for (value, chunk) in values.iter().zip(restored.chunks()) {
            let restored_value = chunk.metadata["score"].as_f64().unwrap();
            assert_eq!(restored_value.to_bits(), value.to_bits(), "{:e}", value);
        }
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let index = VectorIndex::new();
        let restored = VectorIndex::deserialize(&index.serialize().unwrap()).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.dims(), None);
        assert!(restored.search(&[1.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_contains_no_secrets() {
        let blob = sample_index().serialize().unwrap();
        let text = String::from_utf8(blob).unwrap();
        assert!(!text.contains("api_key"));
        assert!(!text.contains("Bearer"));
    }

    #[test]
    fn test_tampered_text_fails_checksum() {
        let blob = sample_index().serialize().unwrap();
        let tampered = String::from_utf8(blob)
            .unwrap()
            .replace("Hospitals open 9-6", "Hospitals open 9-9");
        let err = VectorIndex::deserialize(tampered.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_unsupported_version() {
        let blob = sample_index().serialize().unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        value["version"] = serde_json::json!(99);
        let err = VectorIndex::deserialize(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version 99"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = VectorIndex::deserialize(b"not a snapshot").unwrap_err();
        assert!(matches!(err, RagError::Snapshot(_)));
    }

    #[test]
    fn test_save_load_and_inspect() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("index.json");
        save(&sample_index(), &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), 2);

        let info = inspect(&path).unwrap();
        assert_eq!(info.version, FORMAT_VERSION);
        assert_eq!(info.chunk_count, 2);
        assert_eq!(info.dims, Some(3));
        assert_eq!(info.model.as_deref(), Some("test-model"));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_save_replaces_existing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        std::fs::write(&path, b"old contents").unwrap();
        save(&sample_index(), &path).unwrap();
        assert_eq!(load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load(&tmp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }
}
