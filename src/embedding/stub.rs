//! Deterministic embedder for tests and offline runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::client::Embedder;
use super::error::{EmbeddingError, EmbeddingResult};

/// Produces unit vectors seeded from a BLAKE3 digest of the text, and counts calls.
#[derive(Debug)]
pub struct StubEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl StubEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    /// Number of `embed` calls served so far (failed calls included).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// The vector `embed` returns for `text`, without counting a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let digest = blake3::hash(text.trim().as_bytes());
        let mut seed_bytes = [0u8; 8];
        seed_bytes.copy_from_slice(&digest.as_bytes()[0..8]);
        let mut state = u64::from_le_bytes(seed_bytes);

        let mut embedding = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EMBEDDING_DIM)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::RequestFailed {
                reason: "stub embedder set to fail".to_string(),
            });
        }
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        debug!(text_len = text.len(), "Generating stub embedding");
        Ok(self.vector_for(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
