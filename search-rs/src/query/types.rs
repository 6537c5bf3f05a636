//! Structured query description

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Category of searchable entity with its own field set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Document,
    Folder,
    Mail,
}

/// Everything a caller can ask for in one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescription {
    pub domains: BTreeSet<Domain>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub mail_subject: Option<String>,
    #[serde(default)]
    pub mail_from: Option<String>,
    #[serde(default)]
    pub mail_to: Option<String>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    /// Qualified property name -> raw filter value
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub last_modified_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for QueryDescription {
    fn default() -> Self {
        Self {
            domains: BTreeSet::from([Domain::Document]),
            name: None,
            content: None,
            author: None,
            mime_type: None,
            path: None,
            mail_subject: None,
            mail_from: None,
            mail_to: None,
            keywords: BTreeSet::new(),
            categories: BTreeSet::new(),
            properties: BTreeMap::new(),
            last_modified_from: None,
            last_modified_to: None,
            offset: 0,
            limit: None,
        }
    }
}

impl QueryDescription {
    /// Document search on content only
    pub fn by_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Self::default()
        }
    }

    /// Document search on name only
    pub fn by_name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Document search on keywords only
    pub fn by_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_domains<I: IntoIterator<Item = Domain>>(mut self, domains: I) -> Self {
        self.domains = domains.into_iter().collect();
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Trimmed value, `None` when missing or blank
pub fn normalized(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
