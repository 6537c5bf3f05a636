//! Keyword cloud served from a per-user cache table
//!
//! The cache holds one row per (user, node) with the node's keyword set as
//! JSON. It is filled by [`KeywordCache::refresh_user`] and kept current with
//! [`KeywordCache::set_node_keywords`] and [`KeywordCache::remove_node`].

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::{accumulate, KeywordAggregator, KeywordCloud};
use crate::error::Result;
use crate::repository::{NodeKeywordSource, NodeKeywords};

/// Per-user keyword cache with database persistence
#[derive(Clone)]
pub struct KeywordCache {
    db: SqlitePool,
}

impl KeywordCache {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize the cache table
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_node_keywords (
                user_id TEXT NOT NULL,
                node_id TEXT NOT NULL,
                keywords TEXT NOT NULL,
                PRIMARY KEY (user_id, node_id)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_user_node_keywords_node ON user_node_keywords(node_id)",
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Rebuild every row of `user` from `source`
    pub async fn refresh_user(&self, user: &str, source: &dyn NodeKeywordSource) -> Result<usize> {
        let nodes = source.node_keywords(user).await?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM user_node_keywords WHERE user_id = ?")
            .bind(user)
            .execute(&mut *tx)
            .await?;

        for node in &nodes {
            sqlx::query(
                "INSERT INTO user_node_keywords (user_id, node_id, keywords) VALUES (?, ?, ?)",
            )
            .bind(user)
            .bind(&node.node_id)
            .bind(serde_json::to_string(&node.keywords)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!("Refreshed keyword cache for {} ({} nodes)", user, nodes.len());
        Ok(nodes.len())
    }

    /// Store the keywords of a node as seen by `user`
    pub async fn set_node_keywords(
        &self,
        user: &str,
        node_id: &str,
        keywords: &BTreeSet<String>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_node_keywords (user_id, node_id, keywords) VALUES (?, ?, ?)
            ON CONFLICT(user_id, node_id) DO UPDATE SET keywords = excluded.keywords
            "#,
        )
        .bind(user)
        .bind(node_id)
        .bind(serde_json::to_string(keywords)?)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Drop a node from every user's cache
    pub async fn remove_node(&self, node_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM user_node_keywords WHERE node_id = ?")
            .bind(node_id)
            .execute(&self.db)
            .await?;

        debug!("Removed node {} from {} keyword cache rows", node_id, result.rows_affected());
        Ok(())
    }

    /// Cached keyword sets of `user`, ordered by node
    pub async fn entries(&self, user: &str) -> Result<Vec<NodeKeywords>> {
        let rows = sqlx::query(
            "SELECT node_id, keywords FROM user_node_keywords WHERE user_id = ? ORDER BY node_id",
        )
        .bind(user)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<NodeKeywords> {
                let keywords: String = row.get("keywords");
                Ok(NodeKeywords {
                    node_id: row.get("node_id"),
                    keywords: serde_json::from_str(&keywords)?,
                })
            })
            .collect()
    }
}

/// [`KeywordAggregator`] over a [`KeywordCache`]
pub struct CachedKeywordCloud {
    cache: KeywordCache,
}

impl CachedKeywordCloud {
    pub fn new(cache: KeywordCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl KeywordAggregator for CachedKeywordCloud {
    async fn compute(&self, user: &str, filter: Option<&BTreeSet<String>>) -> Result<KeywordCloud> {
        let entries = self.cache.entries(user).await?;
        Ok(accumulate(entries.iter().map(|n| &n.keywords), filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::LiveKeywordCloud;
    use crate::repository::{MemoryNode, MemoryRepository};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn setup_cache() -> KeywordCache {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let cache = KeywordCache::new(pool);
        cache.init_db().await.unwrap();
        cache
    }

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    async fn repository() -> MemoryRepository {
        let repo = MemoryRepository::new();
        repo.insert(MemoryNode::folder("root", "/okm:root", None)).await;
        repo.insert(MemoryNode::document("a", "/okm:root/a", "root").with_keywords(["red", "blue"]))
            .await;
        repo.insert(MemoryNode::document("b", "/okm:root/b", "root").with_keywords(["red", "green"]))
            .await;
        repo.insert(
            MemoryNode::document("c", "/okm:root/c", "root")
                .with_keywords(["red", "blue", "green"])
                .readable_by(["alice"]),
        )
        .await;
        repo.insert(MemoryNode::document("d", "/okm:root/d", "root").with_keywords(["blue"]))
            .await;
        repo
    }

    #[tokio::test]
    async fn test_set_and_remove_node() {
        let cache = setup_cache().await;
        cache.set_node_keywords("alice", "n1", &set(&["red"])).await.unwrap();
        cache.set_node_keywords("alice", "n1", &set(&["red", "blue"])).await.unwrap();
        cache.set_node_keywords("bob", "n1", &set(&["red", "blue"])).await.unwrap();

        let entries = cache.entries("alice").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].keywords, set(&["blue", "red"]));

        cache.remove_node("n1").await.unwrap();
        assert!(cache.entries("alice").await.unwrap().is_empty());
        assert!(cache.entries("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_stale_rows() {
        let cache = setup_cache().await;
        cache.set_node_keywords("bob", "stale", &set(&["old"])).await.unwrap();

        let repo = repository().await;
        let count = cache.refresh_user("bob", &repo).await.unwrap();
        assert_eq!(count, 4);

        let ids: Vec<String> = cache
            .entries("bob")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "d", "root"]);
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let repo = repository().await;
        let cache = setup_cache().await;
        for user in ["alice", "bob"] {
            cache.refresh_user(user, &repo).await.unwrap();
        }

        let live = LiveKeywordCloud::new(Arc::new(repo));
        let cached = CachedKeywordCloud::new(cache);

        let filters = [
            None,
            Some(set(&[])),
            Some(set(&["red"])),
            Some(set(&["red", "blue"])),
            Some(set(&["purple"])),
        ];
        for user in ["alice", "bob"] {
            for filter in &filters {
                let expected = live.compute(user, filter.as_ref()).await.unwrap();
                let actual = cached.compute(user, filter.as_ref()).await.unwrap();
                assert_eq!(expected, actual, "user {} filter {:?}", user, filter);
            }
        }

        let cloud = live.compute("bob", Some(&set(&["red"]))).await.unwrap();
        assert_eq!(cloud.get("blue"), Some(&1));
        assert_eq!(cloud.get("green"), Some(&1));

        let cloud = live.compute("alice", Some(&set(&["red"]))).await.unwrap();
        assert_eq!(cloud.get("blue"), Some(&2));
        assert_eq!(cloud.get("green"), Some(&2));
    }
}
