//! Index request and document types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::query::CompiledQuery;
use crate::repository::EntityKind;

/// What to run against the index
#[derive(Debug, Clone)]
pub enum IndexRequest {
    Compiled(CompiledQuery),
    /// Free-text statement in the index's own query syntax
    Raw {
        statement: String,
        /// Mandatory top-level context, e.g. `okm:root`
        context: Option<String>,
    },
}

/// Single raw hit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub entity_id: String,
    /// Raw relevance score
    pub score: f32,
    pub excerpt: Option<String>,
}

/// One page of hits plus the total number of matches
#[derive(Debug, Clone, Default)]
pub struct IndexHits {
    pub total: usize,
    pub hits: Vec<IndexHit>,
}

/// Index status
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub segment_count: usize,
}

/// Entity as stored in the index
#[derive(Debug, Clone)]
pub struct IndexedEntity {
    pub id: String,
    pub kind: EntityKind,
    pub path: String,
    pub parent: Option<String>,
    /// Document text or mail body
    pub content: String,
    pub author: Option<String>,
    pub mime_type: Option<String>,
    pub keywords: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    /// Qualified property name -> stored value
    pub properties: BTreeMap<String, String>,
    pub last_modified: DateTime<Utc>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
}

impl IndexedEntity {
    pub fn new(id: &str, kind: EntityKind, path: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            path: path.to_string(),
            parent: None,
            content: String::new(),
            author: None,
            mime_type: None,
            keywords: BTreeSet::new(),
            categories: BTreeSet::new(),
            properties: BTreeMap::new(),
            last_modified: Utc::now(),
            subject: None,
            from: None,
            to: Vec::new(),
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }

    /// First path segment, e.g. `okm:root`
    pub fn context(&self) -> &str {
        self.path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_context() {
        let entity = IndexedEntity::new("1", EntityKind::Document, "/okm:root/a/Draft Spec.odt");
        assert_eq!(entity.name(), "Draft Spec.odt");
        assert_eq!(entity.context(), "okm:root");

        let folder = IndexedEntity::new("2", EntityKind::Folder, "/okm:trash/");
        assert_eq!(folder.name(), "okm:trash");
        assert_eq!(folder.context(), "okm:trash");
    }
}
