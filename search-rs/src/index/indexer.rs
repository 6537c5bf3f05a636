//! Entity indexer using Tantivy
//!
//! Stores repository entities and translates compiled clause trees into
//! tantivy queries.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tantivy::{
    collector::{Count, TopDocs},
    directory::MmapDirectory,
    query::{AllQuery, BooleanQuery, EmptyQuery, Occur, Query, QueryParser, RangeQuery, RegexQuery, TermQuery},
    schema::{
        Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Type, Value, STORED, STRING,
    },
    tokenizer::{LowerCaser, RawTokenizer, RemoveLongFilter, SimpleTokenizer, TextAnalyzer},
    Index, IndexReader, IndexSettings, IndexWriter, ReloadPolicy, TantivyDocument, Term,
};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{IndexHit, IndexHits, IndexRequest, IndexStats, IndexedEntity};
use super::SearchIndex;
use crate::error::{Result, SearchError};
use crate::query::clause::{fields, wildcard_to_regex, Clause, Combinator, CompiledQuery, Group};
use crate::query::compiler::parse_day;
use crate::query::Domain;
use crate::repository::EntityKind;

const WORD_TOKENIZER: &str = "word_lowercase";
const VALUE_TOKENIZER: &str = "value_lowercase";
const PROPERTY_FIELD: &str = "property";
const DEFAULT_EXCERPT_LENGTH: usize = 150;
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Schema fields for repository entities
pub struct EntityFields {
    pub id: Field,
    pub kind: Field,
    pub context: Field,
    pub path: Field,
    pub parent: Field,
    pub name: Field,
    pub text: Field,
    pub content: Field,
    pub author: Field,
    pub mime_type: Field,
    pub keyword: Field,
    pub category: Field,
    pub last_modified: Field,
    pub subject: Field,
    pub from: Field,
    pub to: Field,
    pub property: Field,
}

/// Where a logical clause field lives in the index
enum Target {
    Field(Field, &'static str),
    /// `name=value` terms in the shared property field
    Property(String),
}

/// Tantivy-backed entity index
pub struct EntityIndexer {
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: EntityFields,
    query_parser: QueryParser,
    excerpt_length: usize,
}

impl EntityIndexer {
    /// Open or create an index at the given path
    pub fn open(index_path: &Path, writer_heap_bytes: usize) -> Result<Self> {
        std::fs::create_dir_all(index_path)?;

        let (schema, fields) = Self::build_schema();

        let index = if index_path.join("meta.json").exists() {
            Index::open_in_dir(index_path)?
        } else {
            let dir = MmapDirectory::open(index_path)
                .map_err(|e| SearchError::Index(e.to_string()))?;
            Index::create(dir, schema, IndexSettings::default())?
        };

        Self::from_index(index, fields, writer_heap_bytes)
    }

    /// Index that lives only in memory
    pub fn in_memory() -> Result<Self> {
        let (schema, fields) = Self::build_schema();
        Self::from_index(Index::create_in_ram(schema), fields, WRITER_HEAP_BYTES)
    }

    pub fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    fn from_index(index: Index, fields: EntityFields, writer_heap_bytes: usize) -> Result<Self> {
        let words = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(100))
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(WORD_TOKENIZER, words);

        let values = TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(VALUE_TOKENIZER, values);

        // Reloaded explicitly after each commit so writes are visible immediately
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let writer = index.writer(writer_heap_bytes)?;

        let mut query_parser = QueryParser::for_index(
            &index,
            vec![fields.name, fields.text, fields.content, fields.subject, fields.keyword],
        );
        query_parser.set_conjunction_by_default();

        Ok(Self {
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
            query_parser,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
        })
    }

    /// Build the Tantivy schema
    fn build_schema() -> (Schema, EntityFields) {
        let mut schema_builder = Schema::builder();

        let word_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(WORD_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        // Whole values, lower-cased, so wildcard patterns see the complete value
        let value_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(VALUE_TOKENIZER)
                .set_index_option(IndexRecordOption::Basic),
        );

        let id = schema_builder.add_text_field("id", STRING | STORED);
        let kind = schema_builder.add_text_field("kind", STRING | STORED);
        let context = schema_builder.add_text_field(fields::CONTEXT, value_options.clone());
        let path = schema_builder.add_text_field("path", STORED);
        let parent = schema_builder.add_text_field(fields::PARENT, STRING);
        let name = schema_builder.add_text_field(fields::NAME, value_options.clone());
        let text = schema_builder.add_text_field(fields::TEXT, word_options.clone());
        let content = schema_builder.add_text_field(fields::CONTENT, word_options);
        let author = schema_builder.add_text_field(fields::AUTHOR, STRING);
        let mime_type = schema_builder.add_text_field(fields::MIME_TYPE, STRING);
        let keyword = schema_builder.add_text_field(fields::KEYWORD, value_options.clone());
        let category = schema_builder.add_text_field(fields::CATEGORY, STRING);
        let last_modified = schema_builder.add_text_field(fields::LAST_MODIFIED, STRING);
        let subject = schema_builder.add_text_field(fields::SUBJECT, value_options.clone());
        let from = schema_builder.add_text_field(fields::FROM, value_options.clone());
        let to = schema_builder.add_text_field(fields::TO, value_options.clone());
        let property = schema_builder.add_text_field(PROPERTY_FIELD, value_options);

        let schema = schema_builder.build();

        let fields = EntityFields {
            id,
            kind,
            context,
            path,
            parent,
            name,
            text,
            content,
            author,
            mime_type,
            keyword,
            category,
            last_modified,
            subject,
            from,
            to,
            property,
        };

        (schema, fields)
    }

    /// Index a single entity, replacing any previous version
    pub async fn index_entity(&self, entity: &IndexedEntity) -> Result<()> {
        self.remove_entity(&entity.id).await?;

        let f = &self.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(f.id, &entity.id);
        doc.add_text(f.kind, entity.kind.as_str());
        doc.add_text(f.context, entity.context());
        doc.add_text(f.path, &entity.path);
        doc.add_text(f.name, entity.name());
        doc.add_text(f.last_modified, day_key(entity.last_modified.date_naive()));

        if let Some(parent) = &entity.parent {
            doc.add_text(f.parent, parent);
        }
        if !entity.content.is_empty() {
            let content_field = if entity.kind == EntityKind::Mail { f.content } else { f.text };
            doc.add_text(content_field, &entity.content);
        }
        if let Some(author) = &entity.author {
            doc.add_text(f.author, author);
        }
        if let Some(mime_type) = &entity.mime_type {
            doc.add_text(f.mime_type, mime_type);
        }
        for keyword in &entity.keywords {
            doc.add_text(f.keyword, keyword);
        }
        for category in &entity.categories {
            doc.add_text(f.category, category);
        }
        if let Some(subject) = &entity.subject {
            doc.add_text(f.subject, subject);
        }
        if let Some(from) = &entity.from {
            doc.add_text(f.from, from);
        }
        for to in &entity.to {
            doc.add_text(f.to, to);
        }
        for (name, value) in &entity.properties {
            for term in property_terms(value) {
                doc.add_text(f.property, format!("{}={}", name, term));
            }
        }

        let writer = self.writer.read().await;
        writer.add_document(doc)?;

        Ok(())
    }

    /// Remove an entity from the index
    pub async fn remove_entity(&self, id: &str) -> Result<()> {
        let writer = self.writer.read().await;
        writer.delete_term(Term::from_field_text(self.fields.id, id));
        Ok(())
    }

    /// Commit pending changes and make them searchable
    pub async fn commit(&self) -> Result<()> {
        let mut writer = self.writer.write().await;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        let searcher = self.reader.searcher();
        IndexStats {
            document_count: searcher.num_docs(),
            segment_count: searcher.segment_readers().len(),
        }
    }

    /// Translate a request into a tantivy query plus the terms used for excerpts
    fn build_query(&self, request: &IndexRequest) -> Result<(Box<dyn Query>, Vec<String>)> {
        match request {
            IndexRequest::Compiled(compiled) => {
                Ok((self.compiled_query(compiled)?, excerpt_terms(compiled)))
            }
            IndexRequest::Raw { statement, context } => {
                let parsed = self.query_parser.parse_query(statement)?;
                let terms = statement
                    .split_whitespace()
                    .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();

                let query: Box<dyn Query> = match context {
                    Some(context) => Box::new(BooleanQuery::new(vec![
                        (Occur::Must, parsed),
                        (Occur::Must, self.term_query(self.fields.context, &context.to_lowercase())),
                    ])),
                    None => parsed,
                };
                Ok((query, terms))
            }
        }
    }

    fn compiled_query(&self, compiled: &CompiledQuery) -> Result<Box<dyn Query>> {
        if compiled.domains.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }

        let mut domains: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(compiled.domains.len());
        for domain in &compiled.domains {
            let restricted = BooleanQuery::new(vec![
                (Occur::Must, self.kind_query(domain.domain)),
                (Occur::Must, self.group_query(&domain.group)?),
            ]);
            domains.push((Occur::Should, Box::new(restricted)));
        }

        Ok(Box::new(BooleanQuery::new(domains)))
    }

    fn kind_query(&self, domain: Domain) -> Box<dyn Query> {
        let kinds: &[EntityKind] = match domain {
            Domain::Document => &[EntityKind::Document, EntityKind::Attachment],
            Domain::Folder => &[EntityKind::Folder],
            Domain::Mail => &[EntityKind::Mail],
        };

        Box::new(BooleanQuery::new(
            kinds
                .iter()
                .map(|kind| (Occur::Should, self.term_query(self.fields.kind, kind.as_str())))
                .collect(),
        ))
    }

    fn group_query(&self, group: &Group) -> Result<Box<dyn Query>> {
        if group.is_empty() {
            return Ok(match group.combinator {
                Combinator::All => Box::new(AllQuery),
                Combinator::Any => Box::new(EmptyQuery),
            });
        }

        let occur = match group.combinator {
            Combinator::All => Occur::Must,
            Combinator::Any => Occur::Should,
        };

        let mut subqueries = Vec::with_capacity(group.clauses.len());
        for clause in &group.clauses {
            subqueries.push((occur, self.clause_query(clause)?));
        }

        Ok(Box::new(BooleanQuery::new(subqueries)))
    }

    fn clause_query(&self, clause: &Clause) -> Result<Box<dyn Query>> {
        match clause {
            Clause::Exact { field, value } => Ok(match self.target(field) {
                Target::Field(f, _) => self.term_query(f, value),
                Target::Property(name) => {
                    self.term_query(self.fields.property, &format!("{}={}", name, value.to_lowercase()))
                }
            }),
            Clause::Wildcard { field, pattern } => {
                let (f, regex) = match self.target(field) {
                    Target::Field(f, _) => (f, wildcard_to_regex(pattern)),
                    Target::Property(name) => (
                        self.fields.property,
                        format!("{}{}", regex::escape(&format!("{}=", name)), wildcard_to_regex(pattern)),
                    ),
                };
                let query = RegexQuery::from_pattern(&regex, f)?;
                Ok(Box::new(query))
            }
            Clause::Range { field, from, to } => {
                let (f, field_name, prefix) = match self.target(field) {
                    Target::Field(f, field_name) => (f, field_name, String::new()),
                    Target::Property(name) => (self.fields.property, PROPERTY_FIELD, format!("{}=", name)),
                };
                let lower = Term::from_field_text(f, &format!("{}{}", prefix, day_key(*from)));
                let upper = Term::from_field_text(f, &format!("{}{}", prefix, day_key(*to)));
                Ok(Box::new(RangeQuery::new_term_bounds(
                    field_name.to_string(),
                    Type::Str,
                    &Bound::Included(lower),
                    &Bound::Included(upper),
                )))
            }
            Clause::Group(group) => self.group_query(group),
        }
    }

    fn target(&self, field: &str) -> Target {
        let f = &self.fields;
        match field {
            fields::NAME => Target::Field(f.name, fields::NAME),
            fields::TEXT => Target::Field(f.text, fields::TEXT),
            fields::CONTENT => Target::Field(f.content, fields::CONTENT),
            fields::AUTHOR => Target::Field(f.author, fields::AUTHOR),
            fields::MIME_TYPE => Target::Field(f.mime_type, fields::MIME_TYPE),
            fields::CONTEXT => Target::Field(f.context, fields::CONTEXT),
            fields::PARENT => Target::Field(f.parent, fields::PARENT),
            fields::KEYWORD => Target::Field(f.keyword, fields::KEYWORD),
            fields::CATEGORY => Target::Field(f.category, fields::CATEGORY),
            fields::LAST_MODIFIED => Target::Field(f.last_modified, fields::LAST_MODIFIED),
            fields::SUBJECT => Target::Field(f.subject, fields::SUBJECT),
            fields::FROM => Target::Field(f.from, fields::FROM),
            fields::TO => Target::Field(f.to, fields::TO),
            other => Target::Property(other.to_lowercase()),
        }
    }

    fn term_query(&self, field: Field, value: &str) -> Box<dyn Query> {
        Box::new(TermQuery::new(
            Term::from_field_text(field, value),
            IndexRecordOption::Basic,
        ))
    }

    fn stored_text(doc: &TantivyDocument, field: Field) -> Option<String> {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

#[async_trait]
impl SearchIndex for EntityIndexer {
    async fn search(&self, request: &IndexRequest, offset: usize, limit: usize) -> Result<IndexHits> {
        let (query, terms) = self.build_query(request)?;
        let searcher = self.reader.searcher();

        let total = searcher.search(query.as_ref(), &Count)?;

        // TopDocs rejects a zero limit and sizes its heap from limit + offset
        if limit == 0 || offset >= total {
            return Ok(IndexHits { total, hits: Vec::new() });
        }

        let top_docs = searcher.search(
            query.as_ref(),
            &TopDocs::with_limit(limit.min(total - offset)).and_offset(offset),
        )?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;

            let entity_id = Self::stored_text(&doc, self.fields.id).unwrap_or_default();
            let body = Self::stored_text(&doc, self.fields.text)
                .or_else(|| Self::stored_text(&doc, self.fields.content))
                .unwrap_or_default();

            hits.push(IndexHit {
                entity_id,
                score,
                excerpt: create_excerpt(&body, &terms, self.excerpt_length),
            });
        }

        debug!("Index returned {} of {} hits", hits.len(), total);

        Ok(IndexHits { total, hits })
    }
}

/// `YYYYMMDD`, sorts lexicographically in date order
fn day_key(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Terms stored for a property value: the whole value, each comma-separated
/// option, each word and the day key when the value is a date
fn property_terms(value: &str) -> BTreeSet<String> {
    let value = value.trim();
    let mut terms = BTreeSet::new();
    if value.is_empty() {
        return terms;
    }

    terms.insert(value.to_string());
    terms.extend(
        value
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string),
    );
    terms.extend(value.split_whitespace().map(str::to_string));
    if let Some(day) = parse_day(value) {
        terms.insert(day_key(day));
    }

    terms
}

/// Literal parts of the free-text wildcard clauses of a compiled query
fn excerpt_terms(compiled: &CompiledQuery) -> Vec<String> {
    fn collect(group: &Group, terms: &mut Vec<String>) {
        for clause in &group.clauses {
            match clause {
                Clause::Wildcard { field, pattern }
                    if field == fields::TEXT || field == fields::CONTENT =>
                {
                    let term: String = pattern.chars().filter(|c| *c != '*' && *c != '?').collect();
                    if !term.is_empty() {
                        terms.push(term);
                    }
                }
                Clause::Group(inner) => collect(inner, terms),
                _ => {}
            }
        }
    }

    let mut terms = Vec::new();
    for domain in &compiled.domains {
        collect(&domain.group, &mut terms);
    }
    terms
}

/// Window of `body` around the first occurrence of any term
fn create_excerpt(body: &str, terms: &[String], max_len: usize) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let chars: Vec<char> = body.chars().collect();
    let lower = body.to_lowercase();

    let hit = terms
        .iter()
        .filter_map(|term| lower.find(term.as_str()))
        .min()
        .map(|byte| lower[..byte].chars().count().min(chars.len()))
        .unwrap_or(0);

    let start = if hit > 50 {
        chars[..hit]
            .iter()
            .rposition(|c| c.is_whitespace())
            .filter(|&p| hit - p <= 50)
            .map(|p| p + 1)
            .unwrap_or(hit - 50)
    } else {
        0
    };

    let mut end = (start + max_len).min(chars.len());
    if end < chars.len() {
        if let Some(p) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
            if p > 0 {
                end = start + p;
            }
        }
    }

    let mut excerpt = String::new();
    if start > 0 {
        excerpt.push_str("...");
    }
    excerpt.push_str(chars[start..end].iter().collect::<String>().trim());
    if end < chars.len() {
        excerpt.push_str("...");
    }

    Some(excerpt)
}
