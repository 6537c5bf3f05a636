//! Search service
//!
//! Entry point tying the schema, path scoping, compiler, executor, saved
//! searches and keyword cloud together.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{KeywordCloudStrategy, SearchSettings};
use crate::error::{Result, SearchError};
use crate::executor::{QueryExecutor, SearchResult};
use crate::keywords::{
    CachedKeywordCloud, KeywordAggregator, KeywordCache, KeywordCloud, LiveKeywordCloud,
};
use crate::query::types::normalized;
use crate::query::{compile, CompiledQuery, QueryDescription};
use crate::repository::NodeKeywordSource;
use crate::saved::{
    advance_window, CreateSavedSearchRequest, SavedSearch, SavedSearchManager,
    UpdateSavedSearchRequest,
};
use crate::schema::SchemaResolver;
use crate::scope::PathScopeResolver;

/// Attempts at persisting a dashboard window before giving up
const DASHBOARD_ATTEMPTS: usize = 3;

/// Pick the keyword cloud implementation named by `strategy`
pub fn keyword_aggregator(
    strategy: KeywordCloudStrategy,
    source: Arc<dyn NodeKeywordSource>,
    cache: KeywordCache,
) -> Arc<dyn KeywordAggregator> {
    match strategy {
        KeywordCloudStrategy::Live => Arc::new(LiveKeywordCloud::new(source)),
        KeywordCloudStrategy::Cached => Arc::new(CachedKeywordCloud::new(cache)),
    }
}

pub struct SearchService {
    schema: Arc<SchemaResolver>,
    scopes: PathScopeResolver,
    executor: QueryExecutor,
    saved: SavedSearchManager,
    keywords: Arc<dyn KeywordAggregator>,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(
        schema: Arc<SchemaResolver>,
        scopes: PathScopeResolver,
        executor: QueryExecutor,
        saved: SavedSearchManager,
        keywords: Arc<dyn KeywordAggregator>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            schema,
            scopes,
            executor,
            saved,
            keywords,
            settings,
        }
    }

    pub fn saved_searches(&self) -> &SavedSearchManager {
        &self.saved
    }

    /// Resolve schema and path scope, then compile
    pub async fn compile(&self, query: &QueryDescription) -> Result<CompiledQuery> {
        let schema = self.schema.resolve()?;
        let scope = self
            .scopes
            .resolve(normalized(&query.path).unwrap_or_default())
            .await?;

        Ok(compile(query, &schema, &scope))
    }

    /// Run a query with its own offset and limit
    pub async fn find(&self, query: &QueryDescription, user: &str) -> Result<SearchResult> {
        self.find_paginated(query, query.offset, query.limit, user)
            .await
    }

    /// Run a query with an explicit page
    pub async fn find_paginated(
        &self,
        query: &QueryDescription,
        offset: usize,
        limit: Option<usize>,
        user: &str,
    ) -> Result<SearchResult> {
        let compiled = self.compile(query).await?;
        let limit = self.settings.page_size(limit);
        self.executor.execute(&compiled, offset, limit, user).await
    }

    pub async fn find_by_content(&self, content: &str, user: &str) -> Result<SearchResult> {
        self.find(&QueryDescription::by_content(content), user).await
    }

    pub async fn find_by_name(&self, name: &str, user: &str) -> Result<SearchResult> {
        self.find(&QueryDescription::by_name(name), user).await
    }

    pub async fn find_by_keywords(
        &self,
        keywords: &BTreeSet<String>,
        user: &str,
    ) -> Result<SearchResult> {
        self.find(&QueryDescription::by_keywords(keywords.iter().cloned()), user)
            .await
    }

    /// Documents filed under a category
    pub async fn find_categorized(&self, category_id: &str, user: &str) -> Result<SearchResult> {
        let query = QueryDescription {
            categories: BTreeSet::from([category_id.to_string()]),
            ..QueryDescription::default()
        };
        self.find(&query, user).await
    }

    /// Raw statement restricted to the main hierarchy
    pub async fn find_simple_query(
        &self,
        statement: &str,
        offset: usize,
        limit: Option<usize>,
        user: &str,
    ) -> Result<SearchResult> {
        let limit = self.settings.page_size(limit);
        self.executor
            .execute_simple(statement, offset, limit, user)
            .await
    }

    pub async fn save_search(
        &self,
        user: &str,
        request: CreateSavedSearchRequest,
    ) -> Result<SavedSearch> {
        self.saved.save(user, request).await
    }

    pub async fn update_search(
        &self,
        id: &str,
        user: &str,
        request: UpdateSavedSearchRequest,
    ) -> Result<SavedSearch> {
        self.saved.update(id, user, request).await
    }

    /// Saved search owned by `user`
    pub async fn get_search(&self, id: &str, user: &str) -> Result<SavedSearch> {
        let search = self
            .saved
            .get(id)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("Saved search not found: {}", id)))?;

        if search.user != user {
            return Err(SearchError::Unauthorized(format!(
                "Saved search {} belongs to another user",
                id
            )));
        }
        Ok(search)
    }

    pub async fn delete_search(&self, id: &str, user: &str) -> Result<()> {
        self.saved.delete(id, user).await
    }

    pub async fn list_searches(&self, user: &str) -> Result<Vec<SavedSearch>> {
        self.saved.list_by_user(user).await
    }

    pub async fn list_dashboard_searches(&self, user: &str) -> Result<Vec<SavedSearch>> {
        self.saved.list_dashboard_by_user(user).await
    }

    /// Re-run a dashboard search with its window advanced to now
    pub async fn run_dashboard_search(&self, id: &str, user: &str) -> Result<SearchResult> {
        self.run_dashboard_search_at(id, user, Utc::now()).await
    }

    /// Re-run a dashboard search as if the current time were `now`.
    ///
    /// The advanced window is persisted with a compare-and-swap on the row
    /// revision; a concurrent run that got there first makes this one start
    /// over from the fresh row.
    pub async fn run_dashboard_search_at(
        &self,
        id: &str,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<SearchResult> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let search = self.get_search(id, user).await?;
            if !search.is_dashboard {
                return Err(SearchError::InvalidRequest(format!(
                    "Saved search {} is not a dashboard search",
                    id
                )));
            }

            let mut query = search.query.clone();
            advance_window(&mut query, now);
            info!(
                "Dashboard search {} window {:?} .. {:?}",
                search.name, query.last_modified_from, query.last_modified_to
            );

            let result = self.find(&query, user).await?;

            match self.saved.replace_query(id, search.revision, &query).await {
                Ok(_) => return Ok(result),
                Err(SearchError::Conflict(msg)) if attempt < DASHBOARD_ATTEMPTS => {
                    warn!("Retrying dashboard search {}: {}", id, msg);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Keyword cloud through the configured strategy
    pub async fn keyword_map(
        &self,
        user: &str,
        filter: Option<&BTreeSet<String>>,
    ) -> Result<KeywordCloud> {
        let cloud = self.keywords.compute(user, filter).await?;
        debug!("Keyword cloud for {} has {} entries", user, cloud.len());
        Ok(cloud)
    }
}
