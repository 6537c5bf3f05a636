//! Configuration for search-rs

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SearchError};

/// Environment prefix used by [`Config::load`]
pub const ENV_PREFIX: &str = "SEARCH_RS";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub index: IndexConfig,
    pub storage: StorageConfig,
    pub schema: SchemaConfig,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub keyword_cloud: KeywordCloudConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Directory holding the tantivy index
    pub path: String,
    /// Writer heap size in bytes
    #[serde(default = "default_writer_heap")]
    pub writer_heap_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaConfig {
    /// Property group definitions (TOML)
    pub property_groups_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            excerpt_length: default_excerpt_length(),
        }
    }
}

impl SearchSettings {
    /// Resolve a caller-supplied page size against the configured bounds
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCloudStrategy {
    /// Scan every node of the repository on each request
    #[default]
    Live,
    /// Aggregate the per-user keyword cache
    Cached,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeywordCloudConfig {
    #[serde(default)]
    pub strategy: KeywordCloudStrategy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_writer_heap() -> usize {
    50_000_000
}

fn default_page_size() -> usize {
    10
}

fn default_max_page_size() -> usize {
    500
}

fn default_excerpt_length() -> usize {
    150
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(e.to_string()))?;

        toml::from_str(&content).map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Load a TOML file and overlay `SEARCH_RS__SECTION__KEY` environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| SearchError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| SearchError::Config(e.to_string()))
    }

    pub fn default() -> Self {
        Self {
            index: IndexConfig {
                path: "/tmp/search-rs/index".to_string(),
                writer_heap_bytes: default_writer_heap(),
            },
            storage: StorageConfig {
                database_url: "sqlite://search.db".to_string(),
            },
            schema: SchemaConfig {
                property_groups_path: "property-groups.toml".to_string(),
            },
            search: SearchSettings::default(),
            keyword_cloud: KeywordCloudConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.default_page_size, 10);
        assert_eq!(config.keyword_cloud.strategy, KeywordCloudStrategy::Live);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_page_size_is_clamped() {
        let settings = SearchSettings {
            default_page_size: 10,
            max_page_size: 50,
            excerpt_length: 150,
        };
        assert_eq!(settings.page_size(None), 10);
        assert_eq!(settings.page_size(Some(20)), 20);
        assert_eq!(settings.page_size(Some(1000)), 50);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[index]
path = "/var/lib/search-rs/index"

[storage]
database_url = "sqlite::memory:"

[schema]
property_groups_path = "groups.toml"

[keyword_cloud]
strategy = "cached"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.index.path, "/var/lib/search-rs/index");
        assert_eq!(config.index.writer_heap_bytes, 50_000_000);
        assert_eq!(config.keyword_cloud.strategy, KeywordCloudStrategy::Cached);
        assert_eq!(config.search.max_page_size, 500);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.keyword_cloud.strategy, KeywordCloudStrategy::Live);
        assert_eq!(config.search.excerpt_length, 150);
    }

    #[test]
    fn test_load_overlays_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", include_str!("../config.example.toml")).unwrap();

        std::env::set_var("SEARCH_RS__KEYWORD_CLOUD__STRATEGY", "cached");
        std::env::set_var("SEARCH_RS__LOGGING__LEVEL", "trace");
        let result = Config::load(file.path());
        std::env::remove_var("SEARCH_RS__KEYWORD_CLOUD__STRATEGY");
        std::env::remove_var("SEARCH_RS__LOGGING__LEVEL");

        let config = result.unwrap();
        assert_eq!(config.keyword_cloud.strategy, KeywordCloudStrategy::Cached);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.index.path, "/var/lib/search-rs/index");
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is = = not toml").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(SearchError::Config(_))));
    }
}
