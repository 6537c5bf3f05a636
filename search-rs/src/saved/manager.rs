//! Saved search manager for CRUD operations

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, SearchError};
use crate::query::QueryDescription;
use crate::saved::types::{
    CreateSavedSearchRequest, SavedSearch, UpdateSavedSearchRequest, VisitedNode,
};

const SELECT_COLUMNS: &str =
    "id, user_id, name, query, is_dashboard, revision, created_at, updated_at";

/// Manages saved searches with database persistence
pub struct SavedSearchManager {
    db: SqlitePool,
}

impl SavedSearchManager {
    /// Create a new saved search manager
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Initialize the saved search and visit tables
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS saved_searches (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                query TEXT NOT NULL,
                is_dashboard BOOLEAN DEFAULT 0,
                revision INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_saved_searches_user ON saved_searches(user_id)")
            .execute(&self.db)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dashboard_visited (
                user_id TEXT NOT NULL,
                source TEXT NOT NULL,
                node_id TEXT NOT NULL,
                visited_at TEXT NOT NULL,
                PRIMARY KEY (user_id, source, node_id)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Save a new search
    pub async fn save(&self, user: &str, request: CreateSavedSearchRequest) -> Result<SavedSearch> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let query_json = serde_json::to_string(&request.query)?;

        sqlx::query(
            r#"
            INSERT INTO saved_searches (
                id, user_id, name, query, is_dashboard, revision, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user)
        .bind(&request.name)
        .bind(&query_json)
        .bind(request.is_dashboard)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        info!("Saved search {} ({}) for {}", request.name, id, user);

        Ok(SavedSearch {
            id,
            user: user.to_string(),
            name: request.name,
            query: request.query,
            is_dashboard: request.is_dashboard,
            revision: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a saved search by ID
    pub async fn get(&self, id: &str) -> Result<Option<SavedSearch>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM saved_searches WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(|row| self.row_to_search(row)).transpose()
    }

    /// List all searches of a user
    pub async fn list_by_user(&self, user: &str) -> Result<Vec<SavedSearch>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM saved_searches WHERE user_id = ? ORDER BY name, created_at",
            SELECT_COLUMNS
        ))
        .bind(user)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|row| self.row_to_search(row)).collect()
    }

    /// List the dashboard searches of a user
    pub async fn list_dashboard_by_user(&self, user: &str) -> Result<Vec<SavedSearch>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM saved_searches WHERE user_id = ? AND is_dashboard = 1 ORDER BY name, created_at",
            SELECT_COLUMNS
        ))
        .bind(user)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|row| self.row_to_search(row)).collect()
    }

    /// Update a search on behalf of its owner.
    ///
    /// Fails with `Conflict` when the row changed since it was read, e.g. a
    /// dashboard run advanced its window in between.
    pub async fn update(
        &self,
        id: &str,
        user: &str,
        request: UpdateSavedSearchRequest,
    ) -> Result<SavedSearch> {
        let existing = self.owned(id, user).await?;
        self.apply_update(existing, request).await
    }

    async fn apply_update(
        &self,
        existing: SavedSearch,
        request: UpdateSavedSearchRequest,
    ) -> Result<SavedSearch> {
        let name = request.name.unwrap_or(existing.name);
        let query = request.query.unwrap_or(existing.query);
        let is_dashboard = request.is_dashboard.unwrap_or(existing.is_dashboard);

        let result = sqlx::query(
            r#"
            UPDATE saved_searches
            SET name = ?, query = ?, is_dashboard = ?, revision = revision + 1, updated_at = ?
            WHERE id = ? AND revision = ?
            "#,
        )
        .bind(&name)
        .bind(serde_json::to_string(&query)?)
        .bind(is_dashboard)
        .bind(Utc::now().to_rfc3339())
        .bind(&existing.id)
        .bind(existing.revision)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SearchError::Conflict(format!(
                "Saved search {} changed since revision {}",
                existing.id, existing.revision
            )));
        }

        self.get(&existing.id)
            .await?
            .ok_or_else(|| SearchError::NotFound("Saved search disappeared after update".to_string()))
    }

    /// Replace the query only if the row is still at `expected_revision`
    pub async fn replace_query(
        &self,
        id: &str,
        expected_revision: i64,
        query: &QueryDescription,
    ) -> Result<SavedSearch> {
        let result = sqlx::query(
            r#"
            UPDATE saved_searches
            SET query = ?, revision = revision + 1, updated_at = ?
            WHERE id = ? AND revision = ?
            "#,
        )
        .bind(serde_json::to_string(query)?)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(expected_revision)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(id).await? {
                Some(_) => Err(SearchError::Conflict(format!(
                    "Saved search {} changed since revision {}",
                    id, expected_revision
                ))),
                None => Err(SearchError::NotFound(format!("Saved search not found: {}", id))),
            };
        }

        self.get(id)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("Saved search not found: {}", id)))
    }

    /// Delete a search; dashboard searches also lose their visit rows
    pub async fn delete(&self, id: &str, user: &str) -> Result<()> {
        let existing = self.owned(id, user).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM saved_searches WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if existing.is_dashboard {
            sqlx::query("DELETE FROM dashboard_visited WHERE user_id = ? AND source = ?")
                .bind(user)
                .bind(&existing.name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!("Deleted saved search {} ({}) for {}", existing.name, id, user);

        Ok(())
    }

    /// Remember that `user` opened `node_id` from the dashboard search `source`
    pub async fn record_visit(&self, user: &str, source: &str, node_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dashboard_visited (user_id, source, node_id, visited_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, source, node_id) DO UPDATE SET visited_at = excluded.visited_at
            "#,
        )
        .bind(user)
        .bind(source)
        .bind(node_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn list_visited(&self, user: &str, source: &str) -> Result<Vec<VisitedNode>> {
        use sqlx::Row;

        let rows = sqlx::query(
            r#"
            SELECT user_id, source, node_id, visited_at
            FROM dashboard_visited
            WHERE user_id = ? AND source = ?
            ORDER BY node_id
            "#,
        )
        .bind(user)
        .bind(source)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<VisitedNode> {
                let visited_at: String = row.try_get("visited_at")?;
                Ok(VisitedNode {
                    user: row.try_get("user_id")?,
                    source: row.try_get("source")?,
                    node_id: row.try_get("node_id")?,
                    visited_at: parse_timestamp(&visited_at)?,
                })
            })
            .collect()
    }

    /// Fetch a search and verify ownership
    async fn owned(&self, id: &str, user: &str) -> Result<SavedSearch> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("Saved search not found: {}", id)))?;

        if existing.user != user {
            return Err(SearchError::Unauthorized(
                "Not owner of this saved search".to_string(),
            ));
        }

        Ok(existing)
    }

    /// Convert database row to SavedSearch
    fn row_to_search(&self, row: sqlx::sqlite::SqliteRow) -> Result<SavedSearch> {
        use sqlx::Row;

        let query_json: String = row.try_get("query")?;
        let query: QueryDescription = serde_json::from_str(&query_json)?;

        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(SavedSearch {
            id: row.try_get("id")?,
            user: row.try_get("user_id")?,
            name: row.try_get("name")?,
            query,
            is_dashboard: row.try_get("is_dashboard")?,
            revision: row.try_get("revision")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SearchError::Parse(format!("Invalid timestamp {}: {}", value, e)))
}
