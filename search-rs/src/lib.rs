//! search-rs: Structured search over a document repository
//!
//! Turns a structured query description into a clause tree, runs it against a
//! full-text index and resolves every hit to a permission-filtered entity.
//!
//! # Features
//!
//! - **Query compiler**: per-domain clause groups for documents, folders and mail
//! - **Path scoping**: folder paths expand to every folder below them
//! - **Custom properties**: filters interpreted by the property schema field type
//! - **Saved searches**: SQLite persistence with sliding dashboard windows
//! - **Keyword cloud**: live or cached co-occurrence counts
//!
//! # Example
//!
//! ```no_run
//! use search_rs::query::{compile, QueryDescription};
//! use search_rs::schema::Schema;
//! use search_rs::scope::PathScope;
//!
//! let query = QueryDescription::by_name("draft");
//! let compiled = compile(&query, &Schema::empty(), &PathScope::empty());
//! assert_eq!(compiled.domains.len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`schema`]: Custom property schema
//! - [`scope`]: Folder path scoping
//! - [`query`]: Query description, clause tree and compiler
//! - [`index`]: Full-text index
//! - [`executor`]: Query execution and hit resolution
//! - [`saved`]: Saved and dashboard searches
//! - [`keywords`]: Keyword cloud
//! - [`service`]: Facade over all of the above

pub mod config;
pub mod error;
pub mod executor;
pub mod index;
pub mod keywords;
pub mod logging;
pub mod query;
pub mod repository;
pub mod saved;
pub mod schema;
pub mod scope;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SearchError};
pub use executor::{Hit, SearchResult};
pub use query::{CompiledQuery, Domain, QueryDescription};
pub use service::SearchService;
