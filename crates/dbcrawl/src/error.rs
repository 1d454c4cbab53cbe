//! Error types for the crawl library.

use thiserror::Error;

use crate::strategy::ObjectCategory;

/// Main error type for crawl operations.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// Configuration error (invalid YAML, unknown level, bad pattern, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection lost or refused. Aborts the crawl.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Metadata retrieval failed for one category. The crawl skips the category.
    #[error("Metadata retrieval failed for {category}: {message}")]
    Metadata {
        category: ObjectCategory,
        message: String,
    },

    /// A metadata query failed without losing the connection.
    #[error("Query failed: {0}")]
    Query(String),

    /// The driver does not support a metadata call.
    #[error("Unsupported by driver: {0}")]
    Unsupported(String),

    /// A field was read whose retrieval phase never ran.
    #[error(transparent)]
    NotLoaded(#[from] NotLoaded),

    /// Builder or catalog used out of order.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Mutation attempted after the catalog was frozen.
    #[error("Catalog is frozen: {0}")]
    CatalogFrozen(String),

    /// Crawl deadline passed between phases.
    #[error("Crawl timed out after {0} seconds")]
    Timeout(u64),

    /// Crawl was cancelled (SIGINT, etc.)
    #[error("Crawl cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid inclusion or grep pattern
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

/// Reading a field that was never requested at the configured detail level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} of {object} was not loaded at the configured detail level")]
pub struct NotLoaded {
    pub object: String,
    pub field: &'static str,
}

impl NotLoaded {
    pub fn new(object: impl Into<String>, field: &'static str) -> Self {
        Self {
            object: object.into(),
            field,
        }
    }
}

impl From<tokio_postgres::Error> for CrawlError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            CrawlError::connection(err.to_string(), "postgres session closed")
        } else {
            CrawlError::Query(err.to_string())
        }
    }
}

impl From<tiberius::error::Error> for CrawlError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Io { .. } => {
                CrawlError::connection(err.to_string(), "mssql session lost")
            }
            other => CrawlError::Query(other.to_string()),
        }
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Error> for CrawlError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                CrawlError::connection(err.to_string(), "mysql session lost")
            }
            other => CrawlError::Query(other.to_string()),
        }
    }
}

impl CrawlError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl Into<String>, context: impl Into<String>) -> Self {
        CrawlError::Connection {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Metadata error for a category
    pub fn metadata(category: ObjectCategory, message: impl Into<String>) -> Self {
        CrawlError::Metadata {
            category,
            message: message.into(),
        }
    }

    /// Whether the crawl must stop. Everything else downgrades to a skipped category.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrawlError::Connection { .. }
                | CrawlError::Config(_)
                | CrawlError::Cancelled
                | CrawlError::Timeout(_)
                | CrawlError::CatalogFrozen(_)
                | CrawlError::Io(_)
        )
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CrawlError::Config(_) | CrawlError::Yaml(_) | CrawlError::Regex(_) => 2,
            CrawlError::Connection { .. } => 3,
            CrawlError::Cancelled | CrawlError::Timeout(_) => 130,
            _ => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
