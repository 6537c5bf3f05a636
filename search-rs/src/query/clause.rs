//! Compiled clause tree
//!
//! The tree is built bottom-up by the compiler and never mutated afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::Domain;

/// Logical field names understood by the index
pub mod fields {
    pub const NAME: &str = "name";
    /// Document content
    pub const TEXT: &str = "text";
    /// Mail content
    pub const CONTENT: &str = "content";
    pub const AUTHOR: &str = "author";
    pub const MIME_TYPE: &str = "mime_type";
    /// Top-level alias an entity lives under, e.g. `okm:root`
    pub const CONTEXT: &str = "context";
    pub const PARENT: &str = "parent";
    pub const KEYWORD: &str = "keyword";
    pub const CATEGORY: &str = "category";
    pub const LAST_MODIFIED: &str = "last_modified";
    pub const SUBJECT: &str = "subject";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    /// Every member must match
    All,
    /// At least one member must match
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clause {
    Exact { field: String, value: String },
    /// `*` matches any run of characters, `?` exactly one
    Wildcard { field: String, pattern: String },
    /// Inclusive on both ends
    Range {
        field: String,
        from: NaiveDate,
        to: NaiveDate,
    },
    Group(Group),
}

impl Clause {
    pub fn exact(field: &str, value: impl Into<String>) -> Self {
        Clause::Exact {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn wildcard(field: &str, pattern: impl Into<String>) -> Self {
        Clause::Wildcard {
            field: field.to_string(),
            pattern: pattern.into(),
        }
    }

    pub fn range(field: &str, from: NaiveDate, to: NaiveDate) -> Self {
        Clause::Range {
            field: field.to_string(),
            from,
            to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub combinator: Combinator,
    pub clauses: Vec<Clause>,
}

impl Group {
    pub fn all(clauses: Vec<Clause>) -> Self {
        Self {
            combinator: Combinator::All,
            clauses,
        }
    }

    pub fn any(clauses: Vec<Clause>) -> Self {
        Self {
            combinator: Combinator::Any,
            clauses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// All-group for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainQuery {
    pub domain: Domain,
    pub group: Group,
}

/// Any-combination of per-domain groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub domains: Vec<DomainQuery>,
}

impl CompiledQuery {
    pub fn domain(&self, domain: Domain) -> Option<&Group> {
        self.domains
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| &d.group)
    }

    /// Top-level view as an Any-group
    pub fn to_group(&self) -> Group {
        Group::any(
            self.domains
                .iter()
                .map(|d| Clause::Group(d.group.clone()))
                .collect(),
        )
    }
}

/// Whether a value contains `*` or `?`
pub fn has_wildcard(value: &str) -> bool {
    value.contains(&['*', '?'][..])
}

/// Translate a wildcard pattern into an unanchored regex body
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2);
    let mut literal = String::new();

    for c in pattern.chars() {
        match c {
            '*' | '?' => {
                regex.push_str(&regex::escape(&literal));
                literal.clear();
                regex.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    regex.push_str(&regex::escape(&literal));

    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, value: &str) -> bool {
        regex::Regex::new(&format!("^{}$", wildcard_to_regex(pattern)))
            .unwrap()
            .is_match(value)
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("dra*"));
        assert!(has_wildcard("dr?ft"));
        assert!(!has_wildcard("draft"));
    }

    #[test]
    fn test_wildcard_translation() {
        assert!(matches("*draft*", "draft spec"));
        assert!(matches("*draft*", "the draft"));
        assert!(!matches("*draft*", "final"));
        assert!(matches("dr?ft", "draft"));
        assert!(!matches("dr?ft", "drafts"));
    }

    #[test]
    fn test_wildcard_escapes_regex_metacharacters() {
        assert!(matches("report (v1).pdf", "report (v1).pdf"));
        assert!(!matches("a.c", "abc"));
        assert!(matches("okm:root", "okm:root"));
    }

    #[test]
    fn test_to_group() {
        let compiled = CompiledQuery {
            domains: vec![
                DomainQuery {
                    domain: Domain::Document,
                    group: Group::all(vec![]),
                },
                DomainQuery {
                    domain: Domain::Folder,
                    group: Group::all(vec![Clause::exact(fields::PARENT, "p")]),
                },
            ],
        };
        let group = compiled.to_group();
        assert_eq!(group.combinator, Combinator::Any);
        assert_eq!(group.clauses.len(), 2);
        assert!(compiled.domain(Domain::Mail).is_none());
    }
}
