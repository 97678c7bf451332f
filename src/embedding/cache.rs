//! Two-tier embedding cache.
//!
//! Keys are the hex BLAKE3 digest of the normalized query (see [`hash_query`]).
//! The in-process tier is a bounded `moka` cache; the persistent tier is any
//! [`EmbeddingStore`]. Persistent-tier failures are logged and never reach the caller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::client::Embedder;
use super::error::{EmbeddingError, EmbeddingResult};
use crate::hashing::hash_query;
use crate::storage::StorageResult;

/// Persisted cache row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_hash: String,
    pub query_text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub use_count: u64,
}

impl CacheEntry {
    pub fn new(query_hash: String, query_text: String, embedding: Vec<f32>) -> Self {
        let now = Utc::now();
        Self {
            query_hash,
            query_text,
            embedding,
            created_at: now,
            last_used_at: now,
            use_count: 1,
        }
    }
}

/// Persistent tier of the embedding cache.
#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn get(&self, query_hash: &str) -> StorageResult<Option<CacheEntry>>;

    /// Inserts or replaces the row for `entry.query_hash`. Concurrent writers for
    /// the same hash may race; the last write wins.
    async fn put(&self, entry: &CacheEntry) -> StorageResult<()>;

    /// Bumps `last_used_at` and `use_count`.
    async fn touch(&self, query_hash: &str) -> StorageResult<()>;
}

/// Where a [`CachedEmbedding`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    Memory,
    Store,
    Computed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedEmbedding {
    pub query_hash: String,
    pub vector: Arc<Vec<f32>>,
    pub source: EmbeddingSource,
}

impl CachedEmbedding {
    #[inline]
    pub fn is_hit(&self) -> bool {
        self.source != EmbeddingSource::Computed
    }
}

/// Resolves query embeddings through memory, then the store, then the embedder.
pub struct EmbeddingCache {
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn EmbeddingStore>>,
    memory: Cache<String, Arc<Vec<f32>>>,
}

impl std::fmt::Debug for EmbeddingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingCache")
            .field("memory_entries", &self.memory.entry_count())
            .field("persistent", &self.store.is_some())
            .field("dimensions", &self.embedder.dimensions())
            .finish()
    }
}

impl EmbeddingCache {
    /// Creates a memory-only cache.
    pub fn new(embedder: Arc<dyn Embedder>, capacity: u64) -> Self {
        Self {
            embedder,
            store: None,
            memory: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Adds a persistent tier behind the memory tier.
    pub fn with_store(mut self, store: Arc<dyn EmbeddingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the embedding for `query`, computing it at most once per normalized query
    /// while it stays cached.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn get_or_create(&self, query: &str) -> EmbeddingResult<CachedEmbedding> {
        if query.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let query_hash = hash_query(query);

        if let Some(vector) = self.memory.get(&query_hash) {
            debug!(%query_hash, "Embedding cache hit (memory)");
            self.touch_detached(&query_hash);
            return Ok(CachedEmbedding {
                query_hash,
                vector,
                source: EmbeddingSource::Memory,
            });
        }

        if let Some(store) = &self.store {
            match store.get(&query_hash).await {
                Ok(Some(entry)) if entry.embedding.len() == self.embedder.dimensions() => {
                    debug!(%query_hash, use_count = entry.use_count, "Embedding cache hit (store)");
                    let vector = Arc::new(entry.embedding);
                    self.memory.insert(query_hash.clone(), Arc::clone(&vector));
                    self.touch_detached(&query_hash);
                    return Ok(CachedEmbedding {
                        query_hash,
                        vector,
                        source: EmbeddingSource::Store,
                    });
                }
                Ok(Some(entry)) => {
                    warn!(
                        %query_hash,
                        found = entry.embedding.len(),
                        expected = self.embedder.dimensions(),
                        "Ignoring cached embedding with wrong dimensions"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(%query_hash, error = %e, "Embedding cache read failed; computing");
                }
            }
        }

        let vector = Arc::new(self.embedder.embed(query.trim()).await?);
        debug!(%query_hash, "Embedding cache miss; computed");

        self.memory.insert(query_hash.clone(), Arc::clone(&vector));
        if let Some(store) = &self.store {
            let entry = CacheEntry::new(
                query_hash.clone(),
                query.trim().to_string(),
                vector.as_ref().clone(),
            );
            if let Err(e) = store.put(&entry).await {
                warn!(%query_hash, error = %e, "Embedding cache write failed");
            }
        }

        Ok(CachedEmbedding {
            query_hash,
            vector,
            source: EmbeddingSource::Computed,
        })
    }

    /// Entries currently held in memory.
    pub fn memory_len(&self) -> u64 {
        self.memory.run_pending_tasks();
        self.memory.entry_count()
    }

    /// Drops the in-memory tier; the store is untouched.
    pub fn clear_memory(&self) {
        self.memory.invalidate_all();
    }

    fn touch_detached(&self, query_hash: &str) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let query_hash = query_hash.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.touch(&query_hash).await {
                warn!(%query_hash, error = %e, "Failed to update embedding cache usage");
            }
        });
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory_store::MemoryEmbeddingStore;

#[cfg(any(test, feature = "mock"))]
mod memory_store {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::RwLock;

    use super::{CacheEntry, EmbeddingStore};
    use crate::storage::{StorageError, StorageResult};

    /// In-memory [`EmbeddingStore`] with switchable failures.
    #[derive(Debug, Default)]
    pub struct MemoryEmbeddingStore {
        rows: RwLock<HashMap<String, CacheEntry>>,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        touches: AtomicUsize,
    }

    impl MemoryEmbeddingStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub fn entry(&self, query_hash: &str) -> Option<CacheEntry> {
            self.rows.read().get(query_hash).cloned()
        }

        pub fn len(&self) -> usize {
            self.rows.read().len()
        }

        pub fn is_empty(&self) -> bool {
            self.rows.read().is_empty()
        }

        /// Touches applied so far (failed ones excluded).
        pub fn touches(&self) -> usize {
            self.touches.load(Ordering::SeqCst)
        }

        fn unavailable(op: &str) -> StorageError {
            StorageError::Unavailable {
                reason: format!("memory store set to fail {op}"),
            }
        }
    }

    #[async_trait]
    impl EmbeddingStore for MemoryEmbeddingStore {
        async fn get(&self, query_hash: &str) -> StorageResult<Option<CacheEntry>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::unavailable("reads"));
            }
            Ok(self.rows.read().get(query_hash).cloned())
        }

        async fn put(&self, entry: &CacheEntry) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::unavailable("writes"));
            }
            self.rows
                .write()
                .insert(entry.query_hash.clone(), entry.clone());
            Ok(())
        }

        async fn touch(&self, query_hash: &str) -> StorageResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::unavailable("writes"));
            }
            if let Some(row) = self.rows.write().get_mut(query_hash) {
                row.last_used_at = Utc::now();
                row.use_count += 1;
            }
            self.touches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
