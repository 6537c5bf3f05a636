//! Folder path scoping
//!
//! A concrete folder path expands to the identifiers of the folder and every
//! folder below it. Reserved top-level aliases are matched literally instead.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::repository::HierarchyStore;

/// Main hierarchy root
pub const ROOT_PATH: &str = "/okm:root";

/// Top-level aliases that are never expanded
pub const RESERVED_PATHS: [&str; 6] = [
    ROOT_PATH,
    "/okm:categories",
    "/okm:templates",
    "/okm:personal",
    "/okm:mail",
    "/okm:trash",
];

/// Result of resolving a search path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathScope {
    pub root_id: Option<String>,
    pub descendant_ids: BTreeSet<String>,
}

impl PathScope {
    /// Scope that restricts by literal path only
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root_id.is_none()
    }
}

/// Whether `path` is empty or one of [`RESERVED_PATHS`]
pub fn is_reserved(path: &str) -> bool {
    let path = path.trim().trim_end_matches('/');
    path.is_empty() || RESERVED_PATHS.contains(&path)
}

/// Resolves folder paths against the hierarchy
pub struct PathScopeResolver {
    hierarchy: Arc<dyn HierarchyStore>,
}

impl PathScopeResolver {
    pub fn new(hierarchy: Arc<dyn HierarchyStore>) -> Self {
        Self { hierarchy }
    }

    pub async fn resolve(&self, path: &str) -> Result<PathScope> {
        if is_reserved(path) {
            return Ok(PathScope::empty());
        }

        let path = path.trim();
        let root_id = self
            .hierarchy
            .path_to_id(path)
            .await?
            .ok_or_else(|| SearchError::PathNotFound(path.to_string()))?;

        let mut descendant_ids = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(root_id.clone());
        queue.push_back(root_id.clone());

        while let Some(id) = queue.pop_front() {
            for child in self.hierarchy.child_folder_ids(&id).await? {
                if seen.insert(child.clone()) {
                    queue.push_back(child);
                }
            }
            descendant_ids.insert(id);
        }

        debug!("Path {} expanded to {} folders", path, descendant_ids.len());

        Ok(PathScope {
            root_id: Some(root_id),
            descendant_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryNode, MemoryRepository};

    async fn resolver() -> PathScopeResolver {
        let repo = MemoryRepository::new();
        repo.insert(MemoryNode::folder("root", "/okm:root", None)).await;
        repo.insert(MemoryNode::folder("projects", "/okm:root/projects", Some("root")))
            .await;
        repo.insert(MemoryNode::folder("A", "/okm:root/projects/A", Some("projects")))
            .await;
        repo.insert(MemoryNode::folder("B", "/okm:root/projects/B", Some("projects")))
            .await;
        repo.insert(MemoryNode::folder("B1", "/okm:root/projects/B/B1", Some("B")))
            .await;
        repo.insert(MemoryNode::document("doc", "/okm:root/projects/doc.txt", "projects"))
            .await;
        PathScopeResolver::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_reserved_aliases_are_not_expanded() {
        let resolver = resolver().await;
        for path in ["", "  ", "/okm:root", "/okm:root/", "/okm:trash", "/okm:mail"] {
            let scope = resolver.resolve(path).await.unwrap();
            assert!(scope.is_empty(), "{} should be literal", path);
            assert!(scope.descendant_ids.is_empty());
        }
    }

    #[tokio::test]
    async fn test_expands_all_levels() {
        let resolver = resolver().await;
        let scope = resolver.resolve("/okm:root/projects").await.unwrap();

        assert_eq!(scope.root_id.as_deref(), Some("projects"));
        let ids: Vec<&str> = scope.descendant_ids.iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["A", "B", "B1", "projects"]);
    }

    #[tokio::test]
    async fn test_leaf_folder_scope_contains_itself() {
        let resolver = resolver().await;
        let scope = resolver.resolve("/okm:root/projects/A").await.unwrap();
        assert_eq!(scope.descendant_ids.len(), 1);
        assert!(scope.descendant_ids.contains("A"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let resolver = resolver().await;
        let result = resolver.resolve("/okm:root/nowhere").await;
        assert!(matches!(result, Err(SearchError::PathNotFound(_))));
    }
}
