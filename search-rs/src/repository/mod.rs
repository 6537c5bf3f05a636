//! Collaborators the search core depends on
//!
//! - [`HierarchyStore`]: path resolution and folder children
//! - [`EntityLoader`]: permission-filtered entity summaries
//! - [`NodeKeywordSource`]: keyword sets of every readable node
//! - [`ActivityLog`]: audit records
//!
//! [`MemoryRepository`] implements the first three over an in-memory tree.

pub mod activity;
pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use activity::{ActivityLog, TracingActivityLog};
pub use memory::{MemoryNode, MemoryRepository};
pub use types::{EntityKind, EntitySummary, NodeKeywords};

#[async_trait]
pub trait HierarchyStore: Send + Sync {
    /// Identifier of the node at `path`, `None` when nothing lives there
    async fn path_to_id(&self, path: &str) -> Result<Option<String>>;

    /// Identifiers of the folders directly below `id`
    async fn child_folder_ids(&self, id: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait EntityLoader: Send + Sync {
    /// Summary of `id` as seen by `user`.
    ///
    /// `Ok(None)` when the user may not read the entity,
    /// `Err(SearchError::PathNotFound)` when it does not exist.
    async fn load_summary(&self, id: &str, user: &str) -> Result<Option<EntitySummary>>;
}

#[async_trait]
pub trait NodeKeywordSource: Send + Sync {
    /// Keyword sets of every node `user` can read
    async fn node_keywords(&self, user: &str) -> Result<Vec<NodeKeywords>>;
}
