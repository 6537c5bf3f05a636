use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(e: tantivy::TantivyError) -> Self {
        SearchError::Index(e.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(e: tantivy::query::QueryParserError) -> Self {
        SearchError::Parse(e.to_string())
    }
}

impl SearchError {
    /// Whether the caller may reasonably retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Index(_) | SearchError::Conflict(_) | SearchError::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SearchError::Conflict("stale revision".to_string()).is_retryable());
        assert!(SearchError::Index("merge in progress".to_string()).is_retryable());
        assert!(!SearchError::Parse("bad statement".to_string()).is_retryable());
        assert!(!SearchError::PathNotFound("/okm:root/x".to_string()).is_retryable());
        assert!(!SearchError::SchemaParse("bad schema".to_string()).is_retryable());
        assert!(!SearchError::Repository("gone".to_string()).is_retryable());
    }
}
