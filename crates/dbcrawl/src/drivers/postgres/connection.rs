//! tokio-postgres metadata session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Row};
use tracing::{debug, info, warn};

use super::catalog::metadata_sql;
use crate::config::ConnectionConfig;
use crate::core::traits::{MetadataConnection, MetadataRequest, RowStream};
use crate::core::value::{MetaValue, MetadataRow};
use crate::drivers::common::TlsBuilder;
use crate::error::{CrawlError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// One PostgreSQL session.
pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.effective_port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name("dbcrawl");
        pg_config.connect_timeout(CONNECT_TIMEOUT);

        let context = format!("connecting to PostgreSQL at {}", config.display_target());
        let client = match TlsBuilder::parse(&config.ssl_mode)?.build()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| CrawlError::connection(e.to_string(), context.clone()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL session ended: {}", e);
                    }
                });
                client
            }
            Some(tls) => {
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| CrawlError::connection(e.to_string(), context.clone()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL session ended: {}", e);
                    }
                });
                client
            }
        };

        info!("Connected to PostgreSQL: {}", config.display_target());
        Ok(Self { client })
    }
}

#[async_trait]
impl MetadataConnection for PostgresConnection {
    fn db_type(&self) -> &str {
        "postgres"
    }

    async fn validate(&self) -> Result<()> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn metadata(&self, request: MetadataRequest) -> Result<RowStream<'_>> {
        match metadata_sql(request) {
            Some(sql) => self.query(sql, &[]).await,
            None => Err(CrawlError::Unsupported(format!("{} on PostgreSQL", request))),
        }
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowStream<'_>> {
        let rows = self.client.query_raw(sql, params.iter().copied()).await?;
        let mut labels: Option<Arc<[String]>> = None;
        let stream = rows.map(move |row| -> Result<MetadataRow> {
            let row = row?;
            let labels = labels
                .get_or_insert_with(|| {
                    let names: Vec<&str> = row.columns().iter().map(|c| c.name()).collect();
                    MetadataRow::labels(&names)
                })
                .clone();
            Ok(convert_row(&row, labels))
        });
        Ok(stream.boxed())
    }
}

fn convert_row(row: &Row, labels: Arc<[String]>) -> MetadataRow {
    let values = (0..row.len()).map(|i| convert_value(row, i)).collect();
    MetadataRow::new(labels, values)
}

fn convert_value(row: &Row, idx: usize) -> MetaValue {
    let ty = row.columns()[idx].type_();
    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map(MetaValue::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)
            .map(|v| v.map(i64::from).into())
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map(MetaValue::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map(MetaValue::from)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx)
            .map(|v| v.map(i64::from).into())
    } else {
        row.try_get::<_, Option<String>>(idx).map(MetaValue::from)
    };
    value.unwrap_or_else(|e| {
        debug!("Undecodable {} value in column {}: {}", ty, idx, e);
        MetaValue::Null
    })
}
