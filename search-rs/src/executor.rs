//! Query executor
//!
//! Runs compiled queries or raw statements against the index, normalizes
//! scores and resolves every hit to an entity summary for the acting user.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::index::{IndexRequest, SearchIndex};
use crate::query::CompiledQuery;
use crate::repository::{ActivityLog, EntityKind, EntityLoader, EntitySummary};
use crate::scope::ROOT_PATH;

/// One scored, permission-checked hit
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub excerpt: Option<String>,
    /// Relevance in `0..=100`
    pub score: u8,
    pub entity: EntitySummary,
}

impl Hit {
    pub fn kind(&self) -> EntityKind {
        self.entity.kind
    }

    pub fn entity_id(&self) -> &str {
        &self.entity.id
    }
}

/// One page of results
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    /// Total matches, may exceed `results.len()`
    pub total: usize,
    pub results: Vec<Hit>,
}

/// Map a raw relevance score onto `0..=100`
pub fn normalize_score(score: f32) -> u8 {
    if !score.is_finite() || score <= 0.0 {
        return 0;
    }
    (score * 100.0).floor().min(100.0) as u8
}

pub struct QueryExecutor {
    index: Arc<dyn SearchIndex>,
    loader: Arc<dyn EntityLoader>,
    activity: Arc<dyn ActivityLog>,
}

impl QueryExecutor {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        loader: Arc<dyn EntityLoader>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            index,
            loader,
            activity,
        }
    }

    /// Execute a compiled query
    pub async fn execute(
        &self,
        query: &CompiledQuery,
        offset: usize,
        limit: usize,
        user: &str,
    ) -> Result<SearchResult> {
        let params = serde_json::to_string(query)?;
        self.activity.record(user, "FIND", &params);

        self.run(&IndexRequest::Compiled(query.clone()), offset, limit, user)
            .await
    }

    /// Execute a raw statement restricted to the main hierarchy
    pub async fn execute_simple(
        &self,
        statement: &str,
        offset: usize,
        limit: usize,
        user: &str,
    ) -> Result<SearchResult> {
        self.activity.record(user, "FIND_SIMPLE_QUERY", statement);

        let request = IndexRequest::Raw {
            statement: statement.to_string(),
            context: Some(ROOT_PATH.trim_start_matches('/').to_string()),
        };
        self.run(&request, offset, limit, user).await
    }

    async fn run(
        &self,
        request: &IndexRequest,
        offset: usize,
        limit: usize,
        user: &str,
    ) -> Result<SearchResult> {
        let page = self.index.search(request, offset, limit).await?;

        let mut results = Vec::with_capacity(page.hits.len());
        for hit in page.hits {
            let summary = match self.loader.load_summary(&hit.entity_id, user).await {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    debug!("Skipping unreadable hit {} for {}", hit.entity_id, user);
                    continue;
                }
                Err(SearchError::PathNotFound(path)) => {
                    return Err(SearchError::Repository(format!(
                        "indexed entity not found: {}",
                        path
                    )))
                }
                Err(e) => return Err(e),
            };

            results.push(Hit {
                excerpt: hit.excerpt,
                score: normalize_score(hit.score),
                entity: summary,
            });
        }

        info!(
            "Search for {} returned {} of {} hits (offset {})",
            user,
            results.len(),
            page.total,
            offset
        );

        Ok(SearchResult {
            total: page.total,
            results,
        })
    }
}
