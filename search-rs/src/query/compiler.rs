//! Query compiler
//!
//! Turns a [`QueryDescription`] into a [`CompiledQuery`]. Compilation is a pure
//! function of the description, the property schema and the resolved path scope.
//!
//! Multi-valued filters (keywords, categories, multi-select options) are
//! conjunctive: every requested value must be present on a hit.

use chrono::{DateTime, NaiveDate};
use tracing::debug;

use super::clause::{fields, has_wildcard, Clause, CompiledQuery, DomainQuery, Group};
use super::types::{normalized, Domain, QueryDescription};
use crate::schema::{FieldType, Schema};
use crate::scope::PathScope;

/// Compile a query description
pub fn compile(query: &QueryDescription, schema: &Schema, scope: &PathScope) -> CompiledQuery {
    let common = common_clauses(query, schema);

    let domains: Vec<DomainQuery> = query
        .domains
        .iter()
        .map(|&domain| {
            let mut clauses = match domain {
                Domain::Document => document_clauses(query, scope),
                Domain::Folder => folder_clauses(query, scope),
                Domain::Mail => mail_clauses(query, scope),
            };
            clauses.extend(common.iter().cloned());
            DomainQuery {
                domain,
                group: Group::all(clauses),
            }
        })
        .collect();

    debug!("Compiled query over {} domains", domains.len());

    CompiledQuery { domains }
}

fn document_clauses(query: &QueryDescription, scope: &PathScope) -> Vec<Clause> {
    let mut clauses = Vec::new();

    if let Some(content) = normalized(&query.content) {
        clauses.extend(token_wildcards(fields::TEXT, content));
    }
    if let Some(name) = normalized(&query.name) {
        clauses.push(name_clause(name));
    }
    if let Some(path) = normalized(&query.path) {
        clauses.push(path_clause(path, scope));
    }
    if let Some(mime_type) = normalized(&query.mime_type) {
        clauses.push(Clause::exact(fields::MIME_TYPE, mime_type));
    }
    if let Some(author) = normalized(&query.author) {
        clauses.push(Clause::exact(fields::AUTHOR, author));
    }
    if let (Some(from), Some(to)) = (query.last_modified_from, query.last_modified_to) {
        clauses.push(Clause::range(
            fields::LAST_MODIFIED,
            from.date_naive(),
            to.date_naive(),
        ));
    }

    clauses
}

fn folder_clauses(query: &QueryDescription, scope: &PathScope) -> Vec<Clause> {
    let mut clauses = Vec::new();

    if let Some(name) = normalized(&query.name) {
        clauses.push(name_clause(name));
    }
    if let Some(path) = normalized(&query.path) {
        clauses.push(path_clause(path, scope));
    }

    clauses
}

fn mail_clauses(query: &QueryDescription, scope: &PathScope) -> Vec<Clause> {
    let mut clauses = Vec::new();

    if let Some(path) = normalized(&query.path) {
        clauses.push(path_clause(path, scope));
    }
    if let Some(content) = normalized(&query.content) {
        clauses.extend(token_wildcards(fields::CONTENT, content));
    }
    if let Some(subject) = normalized(&query.mail_subject) {
        clauses.push(Clause::wildcard(fields::SUBJECT, subject.to_lowercase()));
    }
    if let Some(from) = normalized(&query.mail_from) {
        clauses.push(Clause::wildcard(fields::FROM, from.to_lowercase()));
    }
    if let Some(to) = normalized(&query.mail_to) {
        clauses.push(Clause::wildcard(fields::TO, to.to_lowercase()));
    }
    if let Some(mime_type) = normalized(&query.mime_type) {
        clauses.push(Clause::exact(fields::MIME_TYPE, mime_type));
    }

    clauses
}

/// Keywords, categories and property filters, shared by every domain
fn common_clauses(query: &QueryDescription, schema: &Schema) -> Vec<Clause> {
    let mut clauses = Vec::new();

    for keyword in &query.keywords {
        let keyword = keyword.trim();
        if !keyword.is_empty() {
            clauses.push(Clause::wildcard(fields::KEYWORD, keyword.to_lowercase()));
        }
    }

    for category in &query.categories {
        let category = category.trim();
        if !category.is_empty() {
            clauses.push(Clause::exact(fields::CATEGORY, category));
        }
    }

    for (name, raw) in &query.properties {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }

        let Some(field) = schema.field(name) else {
            debug!("Ignoring filter on unknown property {}", name);
            continue;
        };

        match field.field_type {
            FieldType::SelectSingle => {
                clauses.push(Clause::exact(name, value.to_lowercase()));
            }
            FieldType::SelectMultiple => {
                clauses.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|option| !option.is_empty())
                        .map(|option| Clause::exact(name, option.to_lowercase())),
                );
            }
            FieldType::DateInput => {
                if let Some((from, to)) = parse_date_pair(value) {
                    clauses.push(Clause::range(name, from, to));
                } else {
                    debug!("Ignoring unparseable date range {:?} on {}", value, name);
                }
            }
            FieldType::TextInput | FieldType::TextArea => {
                clauses.extend(token_wildcards(name, value));
            }
            FieldType::Other => {
                clauses.push(Clause::wildcard(name, value.to_lowercase()));
            }
        }
    }

    clauses
}

/// Names without wildcards get substring semantics
fn name_clause(name: &str) -> Clause {
    let pattern = if has_wildcard(name) {
        name.to_string()
    } else {
        format!("*{}*", name)
    };
    Clause::wildcard(fields::NAME, pattern.to_lowercase())
}

/// Literal context match for reserved paths, ancestry match otherwise
fn path_clause(path: &str, scope: &PathScope) -> Clause {
    if scope.is_empty() {
        Clause::wildcard(fields::CONTEXT, context_of(path))
    } else {
        Clause::Group(Group::any(
            scope
                .descendant_ids
                .iter()
                .map(|id| Clause::exact(fields::PARENT, id.as_str()))
                .collect(),
        ))
    }
}

fn token_wildcards(field: &str, value: &str) -> Vec<Clause> {
    value
        .split_whitespace()
        .map(|token| Clause::wildcard(field, token.to_lowercase()))
        .collect()
}

/// `/okm:root/` -> `okm:root`
pub fn context_of(path: &str) -> String {
    path.trim().trim_matches('/').to_lowercase()
}

/// Parse `from,to` into two calendar days
fn parse_date_pair(value: &str) -> Option<(NaiveDate, NaiveDate)> {
    let mut parts = value.split(',');
    let from = parse_day(parts.next()?)?;
    let to = parse_day(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((from, to))
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD` and RFC 3339 timestamps
pub fn parse_day(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(token, "%Y%m%d"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(token)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::clause::Combinator;
    use crate::schema::{FieldDefinition, PropertyGroup};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn schema() -> Schema {
        let field = |name: &str, field_type| FieldDefinition {
            name: name.to_string(),
            label: name.to_string(),
            field_type,
            group: "okg:test".to_string(),
        };
        Schema::new(vec![PropertyGroup {
            name: "okg:test".to_string(),
            label: "Test".to_string(),
            fields: vec![
                field("okp:test.single", FieldType::SelectSingle),
                field("okp:test.multi", FieldType::SelectMultiple),
                field("okp:test.text", FieldType::TextInput),
                field("okp:test.area", FieldType::TextArea),
                field("okp:test.date", FieldType::DateInput),
                field("okp:test.check", FieldType::Other),
            ],
        }])
        .unwrap()
    }

    fn document_group(query: &QueryDescription, scope: &PathScope) -> Group {
        compile(query, &schema(), scope)
            .domain(Domain::Document)
            .cloned()
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_name_gets_substring_semantics() {
        let group = document_group(&QueryDescription::by_name(" Draft "), &PathScope::empty());
        assert_eq!(group.clauses, vec![Clause::wildcard(fields::NAME, "*draft*")]);
    }

    #[test]
    fn test_name_with_wildcard_is_not_wrapped() {
        let group = document_group(&QueryDescription::by_name("Dr?ft*"), &PathScope::empty());
        assert_eq!(group.clauses, vec![Clause::wildcard(fields::NAME, "dr?ft*")]);
    }

    #[test]
    fn test_content_tokens_are_anded() {
        let group = document_group(
            &QueryDescription::by_content("Quarterly  REPORT"),
            &PathScope::empty(),
        );
        assert_eq!(group.combinator, Combinator::All);
        assert_eq!(
            group.clauses,
            vec![
                Clause::wildcard(fields::TEXT, "quarterly"),
                Clause::wildcard(fields::TEXT, "report"),
            ]
        );
    }

    #[test]
    fn test_author_and_mime_type_are_exact() {
        let query = QueryDescription {
            author: Some(" alice ".to_string()),
            mime_type: Some("application/pdf".to_string()),
            ..QueryDescription::default()
        };
        let group = document_group(&query, &PathScope::empty());
        assert_eq!(
            group.clauses,
            vec![
                Clause::exact(fields::MIME_TYPE, "application/pdf"),
                Clause::exact(fields::AUTHOR, "alice"),
            ]
        );
    }

    #[test]
    fn test_reserved_path_matches_context_literally() {
        let query = QueryDescription {
            path: Some("/okm:root".to_string()),
            ..QueryDescription::default()
        };
        let group = document_group(&query, &PathScope::empty());
        assert_eq!(group.clauses, vec![Clause::wildcard(fields::CONTEXT, "okm:root")]);
    }

    #[test]
    fn test_concrete_path_matches_ancestry() {
        let query = QueryDescription {
            path: Some("/okm:root/projects".to_string()),
            ..QueryDescription::default()
        };
        let scope = PathScope {
            root_id: Some("projects".to_string()),
            descendant_ids: BTreeSet::from([
                "projects".to_string(),
                "A".to_string(),
                "B".to_string(),
            ]),
        };

        let group = document_group(&query, &scope);
        assert_eq!(
            group.clauses,
            vec![Clause::Group(Group::any(vec![
                Clause::exact(fields::PARENT, "A"),
                Clause::exact(fields::PARENT, "B"),
                Clause::exact(fields::PARENT, "projects"),
            ]))]
        );
    }

    #[test]
    fn test_date_range_requires_both_bounds() {
        let mut query = QueryDescription {
            last_modified_from: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
            ..QueryDescription::default()
        };
        assert!(document_group(&query, &PathScope::empty()).is_empty());

        query.last_modified_to = Some(Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap());
        assert_eq!(
            document_group(&query, &PathScope::empty()).clauses,
            vec![Clause::range(fields::LAST_MODIFIED, day(2024, 3, 1), day(2024, 3, 31))]
        );
    }

    #[test]
    fn test_keywords_and_categories_are_conjunctive() {
        let query = QueryDescription {
            keywords: BTreeSet::from(["Red".to_string(), "blue".to_string()]),
            categories: BTreeSet::from(["cat-1".to_string()]),
            ..QueryDescription::default()
        };
        let group = document_group(&query, &PathScope::empty());

        assert_eq!(group.combinator, Combinator::All);
        assert_eq!(
            group.clauses,
            vec![
                Clause::wildcard(fields::KEYWORD, "red"),
                Clause::wildcard(fields::KEYWORD, "blue"),
                Clause::exact(fields::CATEGORY, "cat-1"),
            ]
        );
    }

    #[test]
    fn test_property_rules_by_field_type() {
        let mut query = QueryDescription::default();
        query.properties.insert("okp:test.single".into(), " Gold ".into());
        query.properties.insert("okp:test.multi".into(), "a, B,,c".into());
        query.properties.insert("okp:test.text".into(), "foo Bar".into());
        query.properties.insert("okp:test.area".into(), "baz".into());
        query.properties.insert("okp:test.date".into(), "2024-01-01,20240131".into());
        query.properties.insert("okp:test.check".into(), " On Hold ".into());

        let group = document_group(&query, &PathScope::empty());
        assert_eq!(
            group.clauses,
            vec![
                Clause::wildcard("okp:test.area", "baz"),
                Clause::wildcard("okp:test.check", "on hold"),
                Clause::range("okp:test.date", day(2024, 1, 1), day(2024, 1, 31)),
                Clause::exact("okp:test.multi", "a"),
                Clause::exact("okp:test.multi", "b"),
                Clause::exact("okp:test.multi", "c"),
                Clause::exact("okp:test.single", "gold"),
                Clause::wildcard("okp:test.text", "foo"),
                Clause::wildcard("okp:test.text", "bar"),
            ]
        );
    }

    #[test]
    fn test_tolerant_property_parsing() {
        let mut query = QueryDescription::default();
        query.properties.insert("okp:unknown.field".into(), "x".into());
        query.properties.insert("okp:test.single".into(), "   ".into());
        query.properties.insert("okp:test.date".into(), "yesterday,today".into());

        let group = document_group(&query, &PathScope::empty());
        assert!(group.is_empty());
    }

    #[test]
    fn test_empty_domain_compiles_to_empty_all_group() {
        let query = QueryDescription::default().with_domains([Domain::Folder]);
        let compiled = compile(&query, &schema(), &PathScope::empty());

        assert_eq!(compiled.domains.len(), 1);
        let group = compiled.domain(Domain::Folder).unwrap();
        assert_eq!(group.combinator, Combinator::All);
        assert!(group.is_empty());
    }

    #[test]
    fn test_folder_ignores_document_only_fields() {
        let query = QueryDescription {
            content: Some("budget".to_string()),
            author: Some("alice".to_string()),
            name: Some("plans".to_string()),
            ..QueryDescription::default()
        }
        .with_domains([Domain::Folder]);

        let compiled = compile(&query, &schema(), &PathScope::empty());
        assert_eq!(
            compiled.domain(Domain::Folder).unwrap().clauses,
            vec![Clause::wildcard(fields::NAME, "*plans*")]
        );
    }

    #[test]
    fn test_mail_fields() {
        let query = QueryDescription {
            content: Some("Invoice".to_string()),
            mail_subject: Some("*Payment*".to_string()),
            mail_from: Some("Billing@Example.com".to_string()),
            mail_to: Some("me@example.com".to_string()),
            mime_type: Some("message/rfc822".to_string()),
            keywords: BTreeSet::from(["urgent".to_string()]),
            ..QueryDescription::default()
        }
        .with_domains([Domain::Mail]);

        let compiled = compile(&query, &schema(), &PathScope::empty());
        assert_eq!(
            compiled.domain(Domain::Mail).unwrap().clauses,
            vec![
                Clause::wildcard(fields::CONTENT, "invoice"),
                Clause::wildcard(fields::SUBJECT, "*payment*"),
                Clause::wildcard(fields::FROM, "billing@example.com"),
                Clause::wildcard(fields::TO, "me@example.com"),
                Clause::exact(fields::MIME_TYPE, "message/rfc822"),
                Clause::wildcard(fields::KEYWORD, "urgent"),
            ]
        );
    }

    #[test]
    fn test_common_clauses_appended_to_every_domain() {
        let query = QueryDescription::by_keywords(["alpha"])
            .with_domains([Domain::Document, Domain::Folder, Domain::Mail]);
        let compiled = compile(&query, &schema(), &PathScope::empty());

        assert_eq!(compiled.domains.len(), 3);
        for domain in &compiled.domains {
            assert_eq!(
                domain.group.clauses,
                vec![Clause::wildcard(fields::KEYWORD, "alpha")]
            );
        }
    }

    #[test]
    fn test_parse_day_formats() {
        assert_eq!(parse_day("2024-02-29"), Some(day(2024, 2, 29)));
        assert_eq!(parse_day("20240229"), Some(day(2024, 2, 29)));
        assert_eq!(parse_day("2024-02-29T13:00:00+02:00"), Some(day(2024, 2, 29)));
        assert_eq!(parse_day("2023-02-29"), None);
    }

    #[test]
    fn test_context_of() {
        assert_eq!(context_of("/okm:root/"), "okm:root");
        assert_eq!(context_of(" /okm:Trash "), "okm:trash");
    }
}
