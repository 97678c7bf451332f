use std::collections::HashMap;

use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{ScoredPoint, Value};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::EducationalContext;
use crate::hashing::passage_point_id;

/// Default `content_type` for rubric passages.
pub const DEFAULT_CONTENT_TYPE: &str = "rubrica";

/// A rubric or standard passage as stored in the index payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub passage_id: String,
    pub content: String,
    pub content_type: String,
    pub domain: Option<String>,
    pub standard_number: Option<u32>,
    pub subject: String,
    pub level: String,
    pub year: i32,
    pub modality: String,
}

impl Passage {
    pub fn new(
        passage_id: impl Into<String>,
        content: impl Into<String>,
        context: &EducationalContext,
    ) -> Self {
        Self {
            passage_id: passage_id.into(),
            content: content.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            domain: None,
            standard_number: None,
            subject: context.subject.clone(),
            level: context.level.clone(),
            year: context.year,
            modality: context.modality.clone(),
        }
    }

    pub fn with_standard(mut self, domain: impl Into<String>, standard_number: u32) -> Self {
        self.domain = Some(domain.into());
        self.standard_number = Some(standard_number);
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Exact match on all four context fields.
    #[inline]
    pub fn matches(&self, context: &EducationalContext) -> bool {
        context.matches(&self.subject, &self.level, self.year, &self.modality)
    }

    pub fn to_payload(&self) -> HashMap<String, Value> {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("passage_id".to_string(), self.passage_id.clone().into());
        payload.insert("content".to_string(), self.content.clone().into());
        payload.insert("content_type".to_string(), self.content_type.clone().into());
        payload.insert("subject".to_string(), self.subject.clone().into());
        payload.insert("level".to_string(), self.level.clone().into());
        payload.insert("year".to_string(), i64::from(self.year).into());
        payload.insert("modality".to_string(), self.modality.clone().into());
        if let Some(domain) = &self.domain {
            payload.insert("domain".to_string(), domain.clone().into());
        }
        if let Some(number) = self.standard_number {
            payload.insert("standard_number".to_string(), i64::from(number).into());
        }
        payload
    }

    /// Rebuilds a passage from a payload. `None` if `content` is missing.
    pub fn from_payload(payload: &HashMap<String, Value>) -> Option<Self> {
        let string = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let content = string("content")?;
        Some(Self {
            passage_id: string("passage_id").unwrap_or_default(),
            content,
            content_type: string("content_type").unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            domain: string("domain"),
            standard_number: payload
                .get("standard_number")
                .and_then(|v| v.as_integer())
                .and_then(|n| u32::try_from(n).ok()),
            subject: string("subject").unwrap_or_default(),
            level: string("level").unwrap_or_default(),
            year: payload
                .get("year")
                .and_then(|v| v.as_integer())
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or_default(),
            modality: string("modality").unwrap_or_default(),
        })
    }
}

/// A passage with its vector, ready to upsert.
#[derive(Debug, Clone)]
pub struct PassagePoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub passage: Passage,
}

impl PassagePoint {
    /// Point id is derived from `passage.passage_id`, so re-indexing replaces the old point.
    pub fn new(vector: Vec<f32>, passage: Passage) -> Self {
        Self {
            id: passage_point_id(&passage.passage_id),
            vector,
            passage,
        }
    }
}

/// Filtered similarity query.
#[derive(Debug, Clone)]
pub struct PassageSearchRequest {
    pub vector: Vec<f32>,
    pub context: EducationalContext,
    pub limit: usize,
    /// Minimum similarity in `[0, 1]`.
    pub score_threshold: f32,
}

impl PassageSearchRequest {
    pub fn new(vector: Vec<f32>, context: EducationalContext, limit: usize) -> Self {
        Self {
            vector,
            context,
            limit,
            score_threshold: 0.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }
}

/// A search match. `score` is clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageHit {
    pub id: u64,
    pub score: f32,
    pub passage: Passage,
}

impl PassageHit {
    /// Points with a non-numeric id or a payload without passage content are skipped.
    pub fn from_scored_point(point: ScoredPoint) -> Option<Self> {
        let id = match point.id.and_then(|pid| pid.point_id_options) {
            Some(PointIdOptions::Num(n)) => n,
            other => {
                warn!(point_id = ?other, "Skipping search hit with non-numeric point id");
                return None;
            }
        };
        let Some(passage) = Passage::from_payload(&point.payload) else {
            warn!(point_id = id, "Skipping search hit with unreadable passage payload");
            return None;
        };

        Some(PassageHit {
            id,
            score: point.score.clamp(0.0, 1.0),
            passage,
        })
    }
}
