//! Saved search types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::QueryDescription;

/// Persisted query description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user: String,
    pub name: String,
    pub query: QueryDescription,
    /// Re-executed on a schedule with a sliding date window
    pub is_dashboard: bool,
    /// Incremented on every write, used for compare-and-swap updates
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to save a new search
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSavedSearchRequest {
    pub name: String,
    pub query: QueryDescription,
    #[serde(default)]
    pub is_dashboard: bool,
}

/// Request to update an existing search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSavedSearchRequest {
    pub name: Option<String>,
    pub query: Option<QueryDescription>,
    pub is_dashboard: Option<bool>,
}

/// Node a user opened from a dashboard search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitedNode {
    pub user: String,
    pub source: String,
    pub node_id: String,
    pub visited_at: DateTime<Utc>,
}
