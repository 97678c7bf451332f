use std::time::Duration;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use tracing::{debug, instrument};

use super::error::VectorDbError;
use super::lexical;
use super::model::{PassageHit, PassagePoint, PassageSearchRequest};
use crate::constants::HYBRID_OVERFETCH_FACTOR;

/// Qdrant-backed passage store for one collection.
#[derive(Clone)]
pub struct QdrantPassageStore {
    client: Qdrant,
    url: String,
    collection: String,
    timeout: Duration,
}

impl std::fmt::Debug for QdrantPassageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantPassageStore")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl QdrantPassageStore {
    /// Creates a store for `collection` at `url`; every request is bounded by `timeout`.
    pub fn new(url: &str, collection: &str, timeout: Duration) -> Result<Self, VectorDbError> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.to_string(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a basic health check request.
    pub async fn health_check(&self) -> Result<(), VectorDbError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Creates the collection (cosine distance) if it does not exist.
    pub async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorDbError> {
        let create_failed = |e: qdrant_client::QdrantError| VectorDbError::CreateCollectionFailed {
            collection: self.collection.clone(),
            message: e.to_string(),
        };

        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(create_failed)?;
        if exists {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine))
                    .on_disk_payload(true),
            )
            .await
            .map_err(create_failed)?;
        Ok(())
    }

    fn context_filter(request: &PassageSearchRequest) -> Filter {
        let context = &request.context;
        Filter::must([
            Condition::matches("year", i64::from(context.year)),
            Condition::matches("subject", context.subject.clone()),
            Condition::matches("level", context.level.clone()),
            Condition::matches("modality", context.modality.clone()),
        ])
    }

    async fn search_filtered(
        &self,
        request: &PassageSearchRequest,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<PassageHit>, VectorDbError> {
        if request.vector.is_empty() {
            return Err(VectorDbError::InvalidRequest {
                reason: "query vector is empty".to_string(),
            });
        }

        let builder =
            SearchPointsBuilder::new(&self.collection, request.vector.clone(), limit as u64)
                .with_payload(true)
                .filter(Self::context_filter(request))
                .score_threshold(threshold);

        let response = self.client.search_points(builder).await.map_err(|e| {
            VectorDbError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(PassageHit::from_scored_point)
            .collect())
    }
}

/// Passage index used by the retriever.
pub trait PassageStore: Send + Sync {
    /// Filtered similarity search, best first, at most `request.limit` hits.
    fn search(
        &self,
        request: &PassageSearchRequest,
    ) -> impl std::future::Future<Output = Result<Vec<PassageHit>, VectorDbError>> + Send;

    /// Like [`search`](Self::search) but blends in lexical relevance of `query_text`.
    fn search_hybrid(
        &self,
        request: &PassageSearchRequest,
        query_text: &str,
        vector_weight: f32,
    ) -> impl std::future::Future<Output = Result<Vec<PassageHit>, VectorDbError>> + Send;

    fn upsert_passages(
        &self,
        points: Vec<PassagePoint>,
    ) -> impl std::future::Future<Output = Result<(), VectorDbError>> + Send;
}

/// Checks the blend weight shared by every hybrid implementation.
pub(crate) fn check_vector_weight(vector_weight: f32) -> Result<(), VectorDbError> {
    if !(0.0..=1.0).contains(&vector_weight) {
        return Err(VectorDbError::HybridUnavailable {
            reason: format!("vector weight {vector_weight} outside [0, 1]"),
        });
    }
    Ok(())
}

impl PassageStore for QdrantPassageStore {
    #[instrument(skip(self, request), fields(collection = %self.collection, limit = request.limit))]
    async fn search(
        &self,
        request: &PassageSearchRequest,
    ) -> Result<Vec<PassageHit>, VectorDbError> {
        let hits = self
            .search_filtered(request, request.limit, request.score_threshold)
            .await?;
        debug!(hits = hits.len(), "Vector search complete");
        Ok(hits)
    }

    #[instrument(skip(self, request, query_text), fields(collection = %self.collection, limit = request.limit))]
    async fn search_hybrid(
        &self,
        request: &PassageSearchRequest,
        query_text: &str,
        vector_weight: f32,
    ) -> Result<Vec<PassageHit>, VectorDbError> {
        check_vector_weight(vector_weight)?;

        let floor = lexical::min_vector_score(request.score_threshold, vector_weight);
        let pool = request.limit.saturating_mul(HYBRID_OVERFETCH_FACTOR);
        let hits = self
            .search_filtered(request, pool, floor)
            .await
            .map_err(|e| VectorDbError::HybridUnavailable {
                reason: e.to_string(),
            })?;

        let blended = lexical::blend(
            hits,
            query_text,
            vector_weight,
            request.score_threshold,
            request.limit,
        );
        debug!(hits = blended.len(), "Hybrid search complete");
        Ok(blended)
    }

    async fn upsert_passages(&self, points: Vec<PassagePoint>) -> Result<(), VectorDbError> {
        if points.is_empty() {
            return Ok(());
        }

        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| PointStruct::new(p.id, p.vector, p.passage.to_payload()))
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, qdrant_points).wait(true))
            .await
            .map_err(|e| VectorDbError::UpsertFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
