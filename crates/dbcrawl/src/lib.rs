//! # dbcrawl
//!
//! Progressive database metadata retrieval and catalog construction.
//!
//! A crawl turns a live metadata connection into a frozen, immutable
//! [`Catalog`] of schemas, tables, columns, keys, indexes, routines,
//! sequences and synonyms:
//!
//! - **Capability descriptors** say what each database family can serve
//! - **Detail levels** choose which fields are retrieved
//! - **Partial loads** record per field whether it was requested
//! - **Derived analysis** adds foreign-key cardinality and weak associations
//!   without touching primary metadata
//! - **Traversal** drives rule engines and formatters in a stable order
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbcrawl::{drivers, Config, CrawlOptions, SchemaCrawler};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> dbcrawl::Result<()> {
//!     let config = Config::load("dbcrawl.yaml")?;
//!     let connection = drivers::connect(&config.connection).await?;
//!     let crawler = SchemaCrawler::with_builtins(CrawlOptions::from_config(&config)?);
//!     let outcome = crawler.crawl(connection.as_ref(), CancellationToken::new()).await?;
//!     println!("{} tables", outcome.catalog.tables().count());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod core;
pub mod crawler;
pub mod drivers;
pub mod error;
pub mod retrieve;
pub mod rules;
pub mod strategy;

// Re-exports for convenient access
pub use analysis::{Analyzer, AnalyzerOptions, ForeignKeyCardinality, WeakAssociation};
pub use builder::CatalogBuilder;
pub use catalog::{
    Catalog, CatalogObject, RetrievalStatus, SortOrder, TraversalHandler, TraversalOptions,
    Traverser,
};
pub use config::{Config, ConnectionConfig, CrawlConfig};
pub use crate::core::{
    CapabilityDescriptor, DriverRegistry, Loaded, MetadataConnection, MetadataRequest,
};
pub use crawler::{CrawlOptions, CrawlOutcome, CrawlReport, SchemaCrawler, SkippedCategory};
pub use error::{CrawlError, NotLoaded, Result};
pub use retrieve::{GrepFilter, InclusionRules, NameFilter};
pub use rules::{Lint, LintSeverity, Linter, RuleEngine};
pub use strategy::{DetailLevels, ObjectCategory, RetrievalField, RetrievalPlan};
