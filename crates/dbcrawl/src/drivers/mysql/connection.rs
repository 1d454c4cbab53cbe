//! SQLx metadata session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Row, ValueRef};
use tracing::{info, warn};

use super::catalog::metadata_sql;
use crate::config::ConnectionConfig;
use crate::core::traits::{MetadataConnection, MetadataRequest, RowStream};
use crate::core::value::{MetaValue, MetadataRow};
use crate::drivers::common::SslMode;
use crate::error::{CrawlError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One MySQL session, held as a single-connection pool.
pub struct MysqlConnection {
    pool: MySqlPool,
}

impl MysqlConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = match SslMode::parse(&config.ssl_mode)? {
            SslMode::Disable => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                MySqlSslMode::Disabled
            }
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        };

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.effective_port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                CrawlError::connection(
                    e.to_string(),
                    format!("connecting to MySQL at {}", config.display_target()),
                )
            })?;

        info!("Connected to MySQL: {}", config.display_target());
        Ok(Self { pool })
    }

    async fn fetch(&self, sql: &str, params: &[&str]) -> Result<Vec<MetadataRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.to_string());
        }
        let rows: Vec<MySqlRow> = query.fetch_all(&self.pool).await?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let names: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
        let labels = MetadataRow::labels(&names);
        Ok(rows
            .iter()
            .map(|row| convert_row(row, labels.clone()))
            .collect())
    }
}

#[async_trait]
impl MetadataConnection for MysqlConnection {
    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn validate(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn metadata(&self, request: MetadataRequest) -> Result<RowStream<'_>> {
        match metadata_sql(request) {
            Some(sql) => self.query(sql, &[]).await,
            None => Err(CrawlError::Unsupported(format!("{} on MySQL", request))),
        }
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowStream<'_>> {
        let rows = self.fetch(sql, params).await?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

fn convert_row(row: &MySqlRow, labels: Arc<[String]>) -> MetadataRow {
    let values = (0..row.len()).map(|i| convert_value(row, i)).collect();
    MetadataRow::new(labels, values)
}

/// Metadata columns are text or integers; anything else is read as bytes.
fn convert_value(row: &MySqlRow, idx: usize) -> MetaValue {
    let is_null = row.try_get_raw(idx).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return MetaValue::Null;
    }
    if let Ok(v) = row.try_get::<String, _>(idx) {
        return MetaValue::Text(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return MetaValue::Int(v);
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return i64::try_from(v).map(MetaValue::Int).unwrap_or(MetaValue::Null);
    }
    match row.try_get::<Vec<u8>, _>(idx) {
        Ok(bytes) => MetaValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => MetaValue::Null,
    }
}
