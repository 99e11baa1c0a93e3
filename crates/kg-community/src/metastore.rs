//! Community summaries and the summarizer seam.

use crate::error::CommunityError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kg_graph::MemoryGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Produces a text summary of one community. Implemented by the caller (typically over an
/// LLM client).
#[async_trait]
pub trait CommunitySummarizer: Send + Sync {
    async fn summarize(&self, community_id: &str, graph: &MemoryGraph)
        -> Result<String, CommunityError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory summary store keyed by community id.
#[derive(Clone, Default)]
pub struct CommunityMetastore {
    summaries: Arc<RwLock<HashMap<String, CommunitySummary>>>,
}

impl CommunityMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the summary of `id`; `created_at` survives replacement.
    pub async fn upsert(&self, id: &str, summary: impl Into<String>) {
        let now = Utc::now();
        let summary = summary.into();
        let mut summaries = self.summaries.write().await;
        summaries
            .entry(id.to_string())
            .and_modify(|s| {
                s.summary = summary.clone();
                s.updated_at = now;
            })
            .or_insert_with(|| CommunitySummary {
                id: id.to_string(),
                summary,
                created_at: now,
                updated_at: now,
            });
    }

    pub async fn get(&self, id: &str) -> Option<CommunitySummary> {
        self.summaries.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.summaries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.summaries.read().await.is_empty()
    }

    /// Summaries ranked by how often the whitespace-separated terms of `keyword` occur in
    /// them (case-insensitive). Summaries matching no term are left out; ties go to the
    /// smaller id. An empty keyword returns the first `top_k` summaries by id.
    pub async fn search(&self, keyword: &str, top_k: usize) -> Vec<CommunitySummary> {
        let terms: Vec<String> = keyword
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let summaries = self.summaries.read().await;
        let mut scored: Vec<(usize, &CommunitySummary)> = summaries
            .values()
            .filter_map(|s| {
                if terms.is_empty() {
                    return Some((0, s));
                }
                let text = s.summary.to_lowercase();
                let score: usize = terms.iter().map(|t| text.matches(t.as_str()).count()).sum();
                (score > 0).then_some((score, s))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub async fn delete(&self, id: &str) -> bool {
        self.summaries.write().await.remove(id).is_some()
    }

    pub async fn truncate(&self) {
        self.summaries.write().await.clear();
    }
}
