//! Database driver implementations.
//!
//! Each family module provides a [`CapabilityDescriptor`] and, where a native
//! client exists, a [`MetadataConnection`]:
//!
//! - [`postgres`]: PostgreSQL via tokio-postgres
//! - [`mssql`]: Microsoft SQL Server via Tiberius
//! - [`mysql`]: MySQL and MariaDB via SQLx (`mysql` feature)
//! - [`generic`]: descriptor for families without a dedicated one
//! - [`memory`]: captured metadata served from YAML
//! - [`common`]: shared TLS configuration
//!
//! # Adding New Databases
//!
//! 1. Create a module under `drivers/` with a descriptor and a connection
//! 2. Register the descriptor in `DriverRegistry::with_builtins()`
//! 3. Add the family to [`connect`]
//!
//! [`CapabilityDescriptor`]: crate::core::traits::CapabilityDescriptor

pub mod common;
pub mod generic;
pub mod memory;
pub mod mssql;
pub mod mysql;
pub mod postgres;

pub use common::{SslMode, TlsBuilder};
pub use generic::GenericDescriptor;
pub use memory::{MemoryConnection, MemoryFixture};
pub use mssql::{MssqlConnection, MssqlDescriptor};
pub use mysql::MysqlDescriptor;
pub use postgres::{PostgresConnection, PostgresDescriptor};

use tracing::debug;

use crate::config::{ConnectionConfig, MEMORY};
use crate::core::registry::DriverRegistry;
use crate::core::traits::MetadataConnection;
use crate::error::{CrawlError, Result};

/// Open a metadata session for a configured connection.
pub async fn connect(config: &ConnectionConfig) -> Result<Box<dyn MetadataConnection>> {
    if config.r#type.eq_ignore_ascii_case(MEMORY) {
        let connection = match &config.fixture {
            Some(path) => MemoryConnection::load(path)?,
            None => MemoryConnection::new(MemoryFixture::default()),
        };
        debug!("Serving metadata from {}", config.display_target());
        return Ok(Box::new(connection));
    }

    match DriverRegistry::normalize_db_type(&config.r#type) {
        Some("postgres") => Ok(Box::new(PostgresConnection::connect(config).await?)),
        Some("mssql") => Ok(Box::new(MssqlConnection::connect(config).await?)),
        #[cfg(feature = "mysql")]
        Some("mysql") => Ok(Box::new(mysql::MysqlConnection::connect(config).await?)),
        #[cfg(not(feature = "mysql"))]
        Some("mysql") => Err(CrawlError::Config(
            "MySQL support requires the 'mysql' feature".into(),
        )),
        _ => Err(CrawlError::Config(format!(
            "No native client for database type '{}'. Supported: postgres, mssql, mysql, memory",
            config.r#type
        ))),
    }
}
