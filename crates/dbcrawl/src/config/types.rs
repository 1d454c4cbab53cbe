//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::traversal::{SortOrder, TraversalOptions};
use crate::core::schema::TableKind;
use crate::strategy::{LevelDefinition, RetrievalField};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database to crawl.
    pub connection: ConnectionConfig,

    /// What to retrieve and how to filter it.
    #[serde(default)]
    pub crawl: CrawlConfig,
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database family: postgres, mssql, mysql, generic, or memory.
    pub r#type: String,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default depends on the family).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// TLS mode: disable, require, verify-ca, verify-full (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Trust the server certificate without validation (SQL Server).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Captured metadata served by the in-memory driver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("fixture", &self.fixture)
            .finish()
    }
}

impl ConnectionConfig {
    /// Whether this connection goes over the network.
    pub fn is_network(&self) -> bool {
        !self.r#type.eq_ignore_ascii_case(MEMORY)
    }

    /// Configured port, or the family's default.
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or_else(|| {
            match crate::core::DriverRegistry::normalize_db_type(&self.r#type) {
                Some("mssql") => 1433,
                Some("mysql") => 3306,
                _ => 5432,
            }
        })
    }

    /// `host:port/database` for logs.
    pub fn display_target(&self) -> String {
        if self.is_network() {
            format!("{}:{}/{}", self.host, self.effective_port(), self.database)
        } else {
            match &self.fixture {
                Some(path) => format!("fixture {}", path.display()),
                None => "empty fixture".to_string(),
            }
        }
    }
}

/// Family name of the in-memory fixture driver.
pub const MEMORY: &str = "memory";

/// Crawl behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Detail level (default: "standard").
    #[serde(default = "default_level")]
    pub detail_level: String,

    /// Replacement level definitions, ascending, each with its cumulative fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_levels: Vec<CustomLevel>,

    #[serde(default)]
    pub schemas: PatternConfig,

    #[serde(default)]
    pub tables: PatternConfig,

    #[serde(default)]
    pub routines: PatternConfig,

    #[serde(default)]
    pub sequences: PatternConfig,

    #[serde(default)]
    pub synonyms: PatternConfig,

    /// Table kinds to retrieve; empty retrieves all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_types: Vec<TableKind>,

    /// Column grep applied to tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grep: Option<GrepConfig>,

    /// Infer weak associations (default: true).
    #[serde(default = "default_true")]
    pub weak_associations: bool,

    /// Deadline for the whole crawl, checked between phases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub sort: SortConfig,

    /// Crawl families without a registered descriptor with generic calls.
    #[serde(default)]
    pub allow_generic_fallback: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            detail_level: default_level(),
            custom_levels: Vec::new(),
            schemas: PatternConfig::default(),
            tables: PatternConfig::default(),
            routines: PatternConfig::default(),
            sequences: PatternConfig::default(),
            synonyms: PatternConfig::default(),
            table_types: Vec::new(),
            grep: None,
            weak_associations: true,
            timeout_secs: None,
            sort: SortConfig::default(),
            allow_generic_fallback: false,
        }
    }
}

/// A user-defined detail level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomLevel {
    pub name: String,
    pub fields: Vec<RetrievalField>,
}

impl From<&CustomLevel> for LevelDefinition {
    fn from(level: &CustomLevel) -> Self {
        LevelDefinition {
            name: level.name.clone(),
            fields: level.fields.iter().copied().collect(),
        }
    }
}

/// Regex include/exclude lists. Patterns must match a whole name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Column grep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepConfig {
    /// Regex tested against `schema.table.column`.
    pub columns: String,

    /// Keep tables with no matching column instead.
    #[serde(default)]
    pub invert: bool,
}

/// Visit order per traversal section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub tables: SortKind,

    #[serde(default)]
    pub routines: SortKind,

    /// Data types, sequences, and synonyms.
    #[serde(default)]
    pub other: SortKind,
}

impl SortConfig {
    pub fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions {
            tables: self.tables.into(),
            routines: self.routines.into(),
            other: self.other.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKind {
    #[default]
    Natural,
    Alphabetical,
}

impl From<SortKind> for SortOrder {
    fn from(kind: SortKind) -> Self {
        match kind {
            SortKind::Natural => SortOrder::Natural,
            SortKind::Alphabetical => SortOrder::Alphabetical,
        }
    }
}

// Default value functions for serde
fn default_level() -> String {
    "standard".to_string()
}

fn default_require() -> String {
    "require".to_string()
}

fn default_true() -> bool {
    true
}
