//! Configuration validation.

use super::Config;
use crate::core::DriverRegistry;
use crate::error::{CrawlError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let conn = &config.connection;
    let known = DriverRegistry::normalize_db_type(&conn.r#type).is_some();
    if !known && conn.is_network() && !config.crawl.allow_generic_fallback {
        return Err(CrawlError::Config(format!(
            "connection.type '{}' is not supported (expected postgres, mssql, mysql, generic, or memory)",
            conn.r#type
        )));
    }

    if conn.is_network() {
        if conn.host.is_empty() {
            return Err(CrawlError::Config("connection.host is required".into()));
        }
        if conn.database.is_empty() {
            return Err(CrawlError::Config("connection.database is required".into()));
        }
        if conn.user.is_empty() {
            return Err(CrawlError::Config("connection.user is required".into()));
        }
        crate::drivers::common::SslMode::parse(&conn.ssl_mode)?;
    }

    let crawl = &config.crawl;
    if let Some(0) = crawl.timeout_secs {
        return Err(CrawlError::Config(
            "crawl.timeout_secs must be at least 1".into(),
        ));
    }

    // Levels and patterns compile the same way the crawler compiles them.
    crawl.detail_levels()?.resolve(&crawl.detail_level)?;
    crawl.inclusion_rules()?;
    crawl.grep_filter()?;

    Ok(())
}
