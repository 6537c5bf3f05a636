//! Property schema loading
//!
//! Schemas are TOML documents of `[[group]]` tables each holding `[[group.field]]`
//! entries. Parsed schemas are cached per source version.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

use super::types::{FieldDefinition, FieldType, PropertyGroup, Schema};
use crate::error::{Result, SearchError};

/// Where the raw schema definition comes from
pub trait SchemaSource: Send + Sync {
    /// Opaque token that changes whenever the schema body changes
    fn version(&self) -> Result<String>;

    fn read(&self) -> Result<String>;
}

/// Schema stored in a file; the version is derived from its metadata
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchemaSource for FileSchemaSource {
    fn version(&self) -> Result<String> {
        let metadata = std::fs::metadata(&self.path)?;
        let modified = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Ok(format!("{}-{}", modified, metadata.len()))
    }

    fn read(&self) -> Result<String> {
        Ok(std::fs::read_to_string(&self.path)?)
    }
}

/// Schema held in memory, never changes
pub struct StaticSchemaSource {
    body: String,
}

impl StaticSchemaSource {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl SchemaSource for StaticSchemaSource {
    fn version(&self) -> Result<String> {
        Ok("static".to_string())
    }

    fn read(&self) -> Result<String> {
        Ok(self.body.clone())
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default, rename = "group")]
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    label: Option<String>,
    #[serde(default, rename = "field")]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    label: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

/// Parse a schema document
pub fn parse_schema(body: &str) -> Result<Schema> {
    let file: SchemaFile =
        toml::from_str(body).map_err(|e| SearchError::SchemaParse(e.to_string()))?;

    let mut groups = Vec::with_capacity(file.groups.len());
    for raw in file.groups {
        let group_name = raw.name.trim().to_string();
        if group_name.is_empty() {
            return Err(SearchError::SchemaParse("group without a name".to_string()));
        }

        let mut fields = Vec::with_capacity(raw.fields.len());
        for field in raw.fields {
            let name = field.name.trim().to_string();
            if name.is_empty() {
                return Err(SearchError::SchemaParse(format!(
                    "field without a name in group {}",
                    group_name
                )));
            }
            fields.push(FieldDefinition {
                label: field.label.unwrap_or_else(|| name.clone()),
                name,
                field_type: FieldType::from_tag(&field.kind),
                group: group_name.clone(),
            });
        }

        groups.push(PropertyGroup {
            label: raw.label.unwrap_or_else(|| group_name.clone()),
            name: group_name,
            fields,
        });
    }

    Schema::new(groups).map_err(SearchError::SchemaParse)
}

/// Loads the schema from a source, re-parsing only when its version changes
pub struct SchemaResolver {
    source: Box<dyn SchemaSource>,
    cached: RwLock<Option<(String, Arc<Schema>)>>,
}

impl SchemaResolver {
    pub fn new(source: Box<dyn SchemaSource>) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Resolver over a schema that never changes
    pub fn fixed(body: impl Into<String>) -> Self {
        Self::new(Box::new(StaticSchemaSource::new(body)))
    }

    /// Current schema
    pub fn resolve(&self) -> Result<Arc<Schema>> {
        let version = self.source.version()?;

        {
            let cached = self
                .cached
                .read()
                .map_err(|e| SearchError::Repository(e.to_string()))?;
            if let Some((cached_version, schema)) = cached.as_ref() {
                if *cached_version == version {
                    debug!("Schema cache hit for version {}", version);
                    return Ok(Arc::clone(schema));
                }
            }
        }

        let schema = Arc::new(parse_schema(&self.source.read()?)?);
        info!(
            "Loaded property schema: {} groups, {} fields",
            schema.groups().len(),
            schema.field_count()
        );

        let mut cached = self
            .cached
            .write()
            .map_err(|e| SearchError::Repository(e.to_string()))?;
        *cached = Some((version, Arc::clone(&schema)));

        Ok(schema)
    }
}
