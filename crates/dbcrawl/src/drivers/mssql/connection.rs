//! Tiberius metadata session.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{info, warn};

use super::catalog::metadata_sql;
use crate::config::ConnectionConfig;
use crate::core::traits::{MetadataConnection, MetadataRequest, RowStream};
use crate::core::value::{MetaValue, MetadataRow};
use crate::drivers::common::SslMode;
use crate::error::{CrawlError, Result};

/// One SQL Server session. Tiberius needs exclusive access per query.
pub struct MssqlConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
}

impl MssqlConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let mut tds = Config::new();
        tds.host(&config.host);
        tds.port(config.effective_port());
        tds.database(&config.database);
        tds.application_name("dbcrawl");
        tds.authentication(AuthMethod::sql_server(&config.user, &config.password));

        if ssl_mode.requires_tls() {
            if config.trust_server_cert || !ssl_mode.verifies_certificate() {
                tds.trust_cert();
            }
            tds.encryption(EncryptionLevel::Required);
        } else {
            warn!("SQL Server encryption is disabled. Credentials will be transmitted in plaintext.");
            tds.encryption(EncryptionLevel::NotSupported);
        }

        let context = format!("connecting to SQL Server at {}", config.display_target());
        let tcp = TcpStream::connect(tds.get_addr())
            .await
            .map_err(|e| CrawlError::connection(e.to_string(), context.clone()))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(|e| CrawlError::connection(e.to_string(), context))?;

        info!("Connected to SQL Server: {}", config.display_target());
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    async fn fetch(&self, sql: &str, params: &[&str]) -> Result<Vec<MetadataRow>> {
        let mut query = Query::new(sql);
        for param in params {
            query.bind(param.to_string());
        }

        let mut client = self.client.lock().await;
        let rows = query.query(&mut *client).await?.into_first_result().await?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let names: Vec<&str> = first.columns().iter().map(|c| c.name()).collect();
        let labels = MetadataRow::labels(&names);
        Ok(rows
            .into_iter()
            .map(|row| convert_row(row, labels.clone()))
            .collect())
    }
}

#[async_trait]
impl MetadataConnection for MssqlConnection {
    fn db_type(&self) -> &str {
        "mssql"
    }

    async fn validate(&self) -> Result<()> {
        self.fetch("SELECT 1 AS ok", &[]).await.map(|_| ())
    }

    async fn metadata(&self, request: MetadataRequest) -> Result<RowStream<'_>> {
        self.query(metadata_sql(request), &[]).await
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowStream<'_>> {
        let rows = self.fetch(sql, params).await?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

fn convert_row(row: Row, labels: Arc<[String]>) -> MetadataRow {
    let values = row.into_iter().map(convert_value).collect();
    MetadataRow::new(labels, values)
}

fn convert_value(data: ColumnData<'static>) -> MetaValue {
    match data {
        ColumnData::Bit(v) => v.into(),
        ColumnData::U8(v) => v.map(i64::from).into(),
        ColumnData::I16(v) => v.map(i64::from).into(),
        ColumnData::I32(v) => v.into(),
        ColumnData::I64(v) => v.into(),
        ColumnData::String(v) => v.map(|s| s.into_owned()).into(),
        _ => MetaValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn test_convert_value_widths() {
        assert_eq!(convert_value(ColumnData::U8(Some(3))), MetaValue::Int(3));
        assert_eq!(convert_value(ColumnData::I16(Some(-2))), MetaValue::Int(-2));
        assert_eq!(convert_value(ColumnData::Bit(Some(true))), MetaValue::Bool(true));
        assert_eq!(convert_value(ColumnData::I32(None)), MetaValue::Null);
    }

    #[test]
    fn test_convert_value_text() {
        let v = convert_value(ColumnData::String(Some(Cow::Borrowed("dbo"))));
        assert_eq!(v, MetaValue::Text("dbo".into()));
        assert_eq!(convert_value(ColumnData::F64(Some(1.5))), MetaValue::Null);
    }
}
