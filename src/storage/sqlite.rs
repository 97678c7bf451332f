//! SQLite-backed relational store.
//!
//! One connection behind a `parking_lot::Mutex`; every call runs on the blocking pool.
//! Timestamps are RFC 3339 text, embeddings are little-endian `f32` blobs and rubric
//! and evaluation bodies are JSON documents.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use super::error::{StorageError, StorageResult};
use crate::context::EducationalContext;
use crate::embedding::{CacheEntry, EmbeddingStore};
use crate::evaluation::{EvaluationRepository, EvaluationResult};
use crate::rubric::{
    IndicatorStatistics, RubricIndicator, RubricQuery, RubricRepository, StatisticsSource,
};
use crate::telemetry::{QueryWithoutResults, RetrievalMetrics, TelemetrySink};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS cache_embeddings (
    query_hash TEXT PRIMARY KEY,
    query_text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    last_used_at TEXT NOT NULL,
    use_count INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS retrieval_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    subject TEXT NOT NULL,
    level TEXT NOT NULL,
    year INTEGER NOT NULL,
    modality TEXT NOT NULL,
    candidates_count INTEGER NOT NULL,
    results_count INTEGER NOT NULL,
    mean_score REAL NOT NULL,
    latency_ms INTEGER NOT NULL,
    reranking_applied INTEGER NOT NULL,
    hybrid_applied INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queries_without_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    subject TEXT NOT NULL,
    level TEXT NOT NULL,
    year INTEGER NOT NULL,
    modality TEXT NOT NULL,
    similarity_threshold REAL NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rubric_indicators (
    indicator_id TEXT NOT NULL,
    year INTEGER NOT NULL,
    level TEXT NOT NULL,
    subject TEXT NOT NULL,
    modality TEXT NOT NULL,
    module INTEGER NOT NULL,
    active INTEGER NOT NULL,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY(indicator_id, year, level, subject, modality)
);

CREATE INDEX IF NOT EXISTS idx_rubric_indicators_scope
    ON rubric_indicators(year, level, module, subject);

CREATE TABLE IF NOT EXISTS indicator_statistics (
    indicator_id TEXT NOT NULL,
    year INTEGER NOT NULL,
    level TEXT NOT NULL,
    mean REAL NOT NULL,
    std_dev REAL NOT NULL,
    PRIMARY KEY(indicator_id, year, level)
);

CREATE TABLE IF NOT EXISTS evaluation_results (
    id TEXT PRIMARY KEY,
    artifact_hash TEXT NOT NULL,
    indicator_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(artifact_hash, indicator_id, version)
);
";

/// `subject` column value for indicators that apply to every subject.
const GENERALIST_SUBJECT: &str = "";

/// Relational store for the embedding cache, telemetry, rubrics, national
/// statistics and evaluation history.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteStore {
    /// Opens or creates the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA_SQL)?;
        info!(path = %path.display(), "SQLite store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts or replaces the national distribution of one indicator.
    pub async fn upsert_statistics(
        &self,
        indicator_id: &str,
        year: i32,
        level: &str,
        statistics: IndicatorStatistics,
    ) -> StorageResult<()> {
        let indicator_id = indicator_id.to_string();
        let level = level.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO indicator_statistics (indicator_id, year, level, mean, std_dev)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(indicator_id, year, level) DO UPDATE SET
                    mean = excluded.mean,
                    std_dev = excluded.std_dev",
                params![indicator_id, year, level, statistics.mean, statistics.std_dev],
            )?;
            Ok(())
        })
        .await
    }

    /// Most recent retrieval metrics, newest first.
    pub async fn recent_retrievals(&self, limit: usize) -> StorageResult<Vec<RetrievalMetrics>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT query, subject, level, year, modality, candidates_count, results_count,
                        mean_score, latency_ms, reranking_applied, hybrid_applied, recorded_at
                 FROM retrieval_metrics
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![to_i64(limit)?], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, bool>(9)?,
                    row.get::<_, bool>(10)?,
                    row.get::<_, String>(11)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (
                    query,
                    subject,
                    level,
                    year,
                    modality,
                    candidates,
                    results,
                    mean_score,
                    latency_ms,
                    reranking_applied,
                    hybrid_applied,
                    recorded_at,
                ) = row?;
                out.push(RetrievalMetrics {
                    query,
                    context: EducationalContext {
                        subject,
                        level,
                        year,
                        modality,
                    },
                    candidates_count: from_i64(candidates)?,
                    results_count: from_i64(results)?,
                    mean_score: mean_score as f32,
                    latency_ms: from_i64(latency_ms)?,
                    reranking_applied,
                    hybrid_applied,
                    recorded_at: parse_timestamp(&recorded_at)?,
                });
            }
            Ok(out)
        })
        .await
    }

    /// Queries that matched nothing, newest first.
    pub async fn recent_empty_queries(
        &self,
        limit: usize,
    ) -> StorageResult<Vec<QueryWithoutResults>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT query, subject, level, year, modality, similarity_threshold, recorded_at
                 FROM queries_without_results
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![to_i64(limit)?], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?;

            let mut out = Vec::new();
            for row in rows {
                let (query, subject, level, year, modality, threshold, recorded_at) = row?;
                out.push(QueryWithoutResults {
                    query,
                    context: EducationalContext {
                        subject,
                        level,
                        year,
                        modality,
                    },
                    similarity_threshold: threshold as f32,
                    recorded_at: parse_timestamp(&recorded_at)?,
                });
            }
            Ok(out)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await?
    }
}

#[async_trait]
impl EmbeddingStore for SqliteStore {
    async fn get(&self, query_hash: &str) -> StorageResult<Option<CacheEntry>> {
        let query_hash = query_hash.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT query_hash, query_text, embedding, created_at, last_used_at, use_count
                     FROM cache_embeddings
                     WHERE query_hash = ?1",
                    params![query_hash],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )
                .optional()?;

            row.map(
                |(query_hash, query_text, blob, created_at, last_used_at, use_count)| {
                    Ok(CacheEntry {
                        query_hash,
                        query_text,
                        embedding: decode_vector(&blob)?,
                        created_at: parse_timestamp(&created_at)?,
                        last_used_at: parse_timestamp(&last_used_at)?,
                        use_count: from_i64(use_count)?,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    async fn put(&self, entry: &CacheEntry) -> StorageResult<()> {
        let entry = entry.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache_embeddings
                    (query_hash, query_text, embedding, dimension, created_at, last_used_at, use_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.query_hash,
                    entry.query_text,
                    encode_vector(&entry.embedding),
                    to_i64(entry.embedding.len())?,
                    entry.created_at.to_rfc3339(),
                    entry.last_used_at.to_rfc3339(),
                    to_i64(entry.use_count)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn touch(&self, query_hash: &str) -> StorageResult<()> {
        let query_hash = query_hash.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE cache_embeddings
                 SET last_used_at = ?2, use_count = use_count + 1
                 WHERE query_hash = ?1",
                params![query_hash, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TelemetrySink for SqliteStore {
    async fn record_retrieval(&self, metrics: &RetrievalMetrics) -> StorageResult<()> {
        let m = metrics.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO retrieval_metrics (
                    query, subject, level, year, modality, candidates_count, results_count,
                    mean_score, latency_ms, reranking_applied, hybrid_applied, recorded_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    m.query,
                    m.context.subject,
                    m.context.level,
                    m.context.year,
                    m.context.modality,
                    to_i64(m.candidates_count)?,
                    to_i64(m.results_count)?,
                    f64::from(m.mean_score),
                    to_i64(m.latency_ms)?,
                    m.reranking_applied,
                    m.hybrid_applied,
                    m.recorded_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_empty_result(&self, query: &QueryWithoutResults) -> StorageResult<()> {
        let q = query.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO queries_without_results (
                    query, subject, level, year, modality, similarity_threshold, recorded_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    q.query,
                    q.context.subject,
                    q.context.level,
                    q.context.year,
                    q.context.modality,
                    f64::from(q.similarity_threshold),
                    q.recorded_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl RubricRepository for SqliteStore {
    #[instrument(skip(self), fields(year = query.year, module = query.module))]
    async fn indicators(&self, query: &RubricQuery) -> StorageResult<Vec<RubricIndicator>> {
        let query = query.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT indicator_id, body FROM rubric_indicators
                 WHERE year = ?1 AND level = ?2 AND module = ?3 AND active = 1
                   AND (subject = ?4 OR subject = ?5)
                 ORDER BY indicator_id, modality",
            )?;
            let rows = stmt.query_map(
                params![
                    query.year,
                    query.level,
                    query.module,
                    query.subject,
                    GENERALIST_SUBJECT
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?;

            let mut out = Vec::new();
            for row in rows {
                let (indicator_id, body) = row?;
                let indicator = RubricIndicator::from_json(&body).map_err(|e| {
                    StorageError::InvalidData {
                        reason: format!("stored rubric '{indicator_id}': {e}"),
                    }
                })?;
                if query.matches(&indicator) {
                    out.push(indicator);
                }
            }
            debug!(count = out.len(), "Rubric indicators loaded");
            Ok(out)
        })
        .await
    }

    async fn upsert_indicator(&self, indicator: &RubricIndicator) -> StorageResult<()> {
        let body = serde_json::to_string(indicator)?;
        let indicator_id = indicator.indicator_id.clone();
        let year = indicator.year;
        let level = indicator.level.clone();
        let subject = indicator
            .subject
            .clone()
            .unwrap_or_else(|| GENERALIST_SUBJECT.to_string());
        let modality = indicator.modality.clone();
        let module = indicator.module;
        let active = indicator.active;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO rubric_indicators
                    (indicator_id, year, level, subject, modality, module, active, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(indicator_id, year, level, subject, modality) DO UPDATE SET
                    module = excluded.module,
                    active = excluded.active,
                    body = excluded.body,
                    updated_at = excluded.updated_at",
                params![
                    indicator_id,
                    year,
                    level,
                    subject,
                    modality,
                    module,
                    active,
                    body,
                    Utc::now().to_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl StatisticsSource for SqliteStore {
    async fn statistics(
        &self,
        indicator_id: &str,
        year: i32,
        level: &str,
    ) -> StorageResult<Option<IndicatorStatistics>> {
        let indicator_id = indicator_id.to_string();
        let level = level.to_string();
        self.with_conn(move |conn| {
            let stats = conn
                .query_row(
                    "SELECT mean, std_dev FROM indicator_statistics
                     WHERE indicator_id = ?1 AND year = ?2 AND level = ?3",
                    params![indicator_id, year, level],
                    |row| {
                        Ok(IndicatorStatistics {
                            mean: row.get(0)?,
                            std_dev: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(stats)
        })
        .await
    }
}

#[async_trait]
impl EvaluationRepository for SqliteStore {
    #[instrument(skip(self, result), fields(indicator_id = %result.indicator_id))]
    async fn save(&self, result: &EvaluationResult) -> StorageResult<u32> {
        let mut result = result.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let previous: Option<u32> = tx.query_row(
                "SELECT MAX(version) FROM evaluation_results
                 WHERE artifact_hash = ?1 AND indicator_id = ?2",
                params![result.artifact_hash, result.indicator_id],
                |row| row.get(0),
            )?;
            result.version = previous.unwrap_or(0) + 1;

            tx.execute(
                "INSERT INTO evaluation_results
                    (id, artifact_hash, indicator_id, version, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    result.id.to_string(),
                    result.artifact_hash,
                    result.indicator_id,
                    result.version,
                    serde_json::to_string(&result)?,
                    result.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            debug!(version = result.version, "Evaluation result stored");
            Ok(result.version)
        })
        .await
    }

    async fn history(
        &self,
        artifact_hash: &str,
        indicator_id: &str,
    ) -> StorageResult<Vec<EvaluationResult>> {
        let artifact_hash = artifact_hash.to_string();
        let indicator_id = indicator_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT body FROM evaluation_results
                 WHERE artifact_hash = ?1 AND indicator_id = ?2
                 ORDER BY version",
            )?;
            let rows = stmt.query_map(params![artifact_hash, indicator_id], |row| {
                row.get::<_, String>(0)
            })?;

            let mut out = Vec::new();
            for body in rows {
                out.push(serde_json::from_str(&body?)?);
            }
            Ok(out)
        })
        .await
    }
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_vector(blob: &[u8]) -> StorageResult<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::InvalidData {
            reason: format!("embedding blob length {} is not a multiple of 4", blob.len()),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidData {
            reason: format!("bad timestamp {value:?}: {e}"),
        })
}

fn to_i64<N: TryInto<i64>>(value: N) -> StorageResult<i64> {
    value.try_into().map_err(|_| StorageError::InvalidData {
        reason: "integer does not fit in a SQLite column".to_string(),
    })
}

fn from_i64<N: TryFrom<i64>>(value: i64) -> StorageResult<N> {
    N::try_from(value).map_err(|_| StorageError::InvalidData {
        reason: format!("stored integer {value} is out of range"),
    })
}
