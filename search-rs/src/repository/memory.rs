//! In-memory repository tree

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::{EntityKind, EntitySummary, NodeKeywords};
use super::{EntityLoader, HierarchyStore, NodeKeywordSource};
use crate::error::{Result, SearchError};

/// Node stored in a [`MemoryRepository`]
#[derive(Debug, Clone)]
pub struct MemoryNode {
    pub summary: EntitySummary,
    pub parent: Option<String>,
    /// Users allowed to read the node; `None` means everybody
    pub readers: Option<HashSet<String>>,
}

impl MemoryNode {
    pub fn new(id: &str, kind: EntityKind, path: &str, parent: Option<&str>) -> Self {
        Self {
            summary: EntitySummary::new(id, kind, path),
            parent: parent.map(str::to_string),
            readers: None,
        }
    }

    pub fn folder(id: &str, path: &str, parent: Option<&str>) -> Self {
        Self::new(id, EntityKind::Folder, path, parent)
    }

    pub fn document(id: &str, path: &str, parent: &str) -> Self {
        Self::new(id, EntityKind::Document, path, Some(parent))
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.summary.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.summary.author = Some(author.to_string());
        self
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.summary.last_modified = Some(at);
        self
    }

    pub fn readable_by<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.readers = Some(users.into_iter().map(Into::into).collect());
        self
    }

    fn can_read(&self, user: &str) -> bool {
        self.readers.as_ref().map_or(true, |r| r.contains(user))
    }
}

#[derive(Default)]
struct Tree {
    nodes: HashMap<String, MemoryNode>,
    paths: HashMap<String, String>,
}

/// Hierarchy, entity loader and keyword source backed by a map
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node
    pub async fn insert(&self, node: MemoryNode) {
        let mut tree = self.tree.write().await;
        tree.paths
            .insert(node.summary.path.clone(), node.summary.id.clone());
        tree.nodes.insert(node.summary.id.clone(), node);
    }

    pub async fn remove(&self, id: &str) -> Option<MemoryNode> {
        let mut tree = self.tree.write().await;
        let node = tree.nodes.remove(id)?;
        tree.paths.remove(&node.summary.path);
        Some(node)
    }

    /// Replace the keyword set of a node
    pub async fn set_keywords(&self, id: &str, keywords: BTreeSet<String>) -> Result<()> {
        let mut tree = self.tree.write().await;
        let node = tree
            .nodes
            .get_mut(id)
            .ok_or_else(|| SearchError::PathNotFound(id.to_string()))?;
        node.summary.keywords = keywords;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.tree.read().await.nodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tree.read().await.nodes.is_empty()
    }
}

#[async_trait]
impl HierarchyStore for MemoryRepository {
    async fn path_to_id(&self, path: &str) -> Result<Option<String>> {
        let tree = self.tree.read().await;
        Ok(tree.paths.get(path.trim_end_matches('/')).cloned())
    }

    async fn child_folder_ids(&self, id: &str) -> Result<Vec<String>> {
        let tree = self.tree.read().await;
        let mut children: Vec<String> = tree
            .nodes
            .values()
            .filter(|n| n.summary.kind == EntityKind::Folder && n.parent.as_deref() == Some(id))
            .map(|n| n.summary.id.clone())
            .collect();
        children.sort();
        Ok(children)
    }
}

#[async_trait]
impl EntityLoader for MemoryRepository {
    async fn load_summary(&self, id: &str, user: &str) -> Result<Option<EntitySummary>> {
        let tree = self.tree.read().await;
        let node = tree
            .nodes
            .get(id)
            .ok_or_else(|| SearchError::PathNotFound(id.to_string()))?;

        if node.can_read(user) {
            Ok(Some(node.summary.clone()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl NodeKeywordSource for MemoryRepository {
    async fn node_keywords(&self, user: &str) -> Result<Vec<NodeKeywords>> {
        let tree = self.tree.read().await;
        let mut nodes: Vec<NodeKeywords> = tree
            .nodes
            .values()
            .filter(|n| n.can_read(user))
            .map(|n| NodeKeywords {
                node_id: n.summary.id.clone(),
                keywords: n.summary.keywords.clone(),
            })
            .collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        Ok(nodes)
    }
}
