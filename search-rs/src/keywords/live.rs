//! Keyword cloud computed from the repository on every call

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use super::{accumulate, KeywordAggregator, KeywordCloud};
use crate::error::Result;
use crate::repository::NodeKeywordSource;

pub struct LiveKeywordCloud {
    source: Arc<dyn NodeKeywordSource>,
}

impl LiveKeywordCloud {
    pub fn new(source: Arc<dyn NodeKeywordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl KeywordAggregator for LiveKeywordCloud {
    async fn compute(&self, user: &str, filter: Option<&BTreeSet<String>>) -> Result<KeywordCloud> {
        let nodes = self.source.node_keywords(user).await?;
        debug!("Live keyword cloud scanning {} nodes for {}", nodes.len(), user);
        Ok(accumulate(nodes.iter().map(|n| &n.keywords), filter))
    }
}
