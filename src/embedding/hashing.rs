//! Offline embedding by character-trigram feature hashing.
//!
//! Each word (split on non-alphanumeric characters, lowercased) contributes
//! its character trigrams, or the whole word when it is three characters or
//! shorter. Features are hashed with FNV-1a into `dims` buckets and the
//! result is L2-normalized. Works on any script, including Hangul.
//!
//! Used for development corpora and tests where no embedding API is
//! available. Output is deterministic across processes and platforms.

use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::error::RagResult;

pub const DEFAULT_DIMS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed synchronously; never fails.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();

        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let chars: Vec<char> = word.chars().collect();
            if chars.len() <= 3 {
                vector[self.bucket(&chars)] += 1.0;
            } else {
                for window in chars.windows(3) {
                    vector[self.bucket(window)] += 1.0;
                }
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    fn bucket(&self, feature: &[char]) -> usize {
        let mut hash = FNV_OFFSET;
        for c in feature {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        (hash % self.dims as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_name(&self) -> &str {
        "hashing-trigram"
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> RagResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }
}
