//! Entity summaries handed back by the repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of entity a search hit resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Document,
    Folder,
    Mail,
    Attachment,
}

impl EntityKind {
    /// Convert to index string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Document => "document",
            EntityKind::Folder => "folder",
            EntityKind::Mail => "mail",
            EntityKind::Attachment => "attachment",
        }
    }
}

/// Read-only view of a repository entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: String,
    pub kind: EntityKind,
    pub path: String,
    pub author: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub keywords: BTreeSet<String>,
}

impl EntitySummary {
    pub fn new(id: impl Into<String>, kind: EntityKind, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            path: path.into(),
            author: None,
            last_modified: None,
            keywords: BTreeSet::new(),
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Keyword set attached to one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeKeywords {
    pub node_id: String,
    pub keywords: BTreeSet<String>,
}
