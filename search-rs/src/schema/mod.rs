//! Custom property schema
//!
//! Property groups declare typed metadata fields. The field type decides how a
//! property filter value is turned into clauses by the query compiler.

pub mod resolver;
pub mod types;

pub use resolver::{parse_schema, FileSchemaSource, SchemaResolver, SchemaSource, StaticSchemaSource};
pub use types::{FieldDefinition, FieldType, PropertyGroup, Schema};
