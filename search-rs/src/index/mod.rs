//! Full-text index collaborator
//!
//! [`SearchIndex`] is what the executor talks to; [`EntityIndexer`] is the
//! tantivy implementation.

pub mod indexer;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use indexer::EntityIndexer;
pub use types::{IndexHit, IndexHits, IndexRequest, IndexStats, IndexedEntity};

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Run `request`, returning the total match count and at most `limit` hits after `offset`
    async fn search(&self, request: &IndexRequest, offset: usize, limit: usize) -> Result<IndexHits>;
}
