//! In-memory fixture connection.
//!
//! Serves metadata rows from a YAML document instead of a live database.
//! Used for offline crawls of captured metadata and for tests, which can
//! inject faults per request to exercise partial-failure handling.
//!
//! ```yaml
//! db_type: postgres
//! metadata:
//!   schemas:
//!     - { schema_name: public }
//!   tables:
//!     - { schema_name: public, table_name: customer, table_type: TABLE }
//! queries:
//!   - contains: pg_enum
//!     params: [mood]
//!     rows:
//!       - { enumlabel: happy }
//! faults:
//!   - { request: routines, kind: metadata }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::debug;

use crate::core::traits::{MetadataConnection, MetadataRequest, RowStream};
use crate::core::value::{MetaValue, MetadataRow};
use crate::error::{CrawlError, Result};

type FixtureRow = BTreeMap<String, MetaValue>;

/// Rows returned for descriptor SQL containing a marker string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryFixture {
    /// Substring the SQL must contain.
    pub contains: String,
    /// Exact parameters to match; any parameters when omitted.
    #[serde(default)]
    pub params: Option<Vec<String>>,
    #[serde(default)]
    pub rows: Vec<FixtureRow>,
}

/// How an injected fault fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Recoverable driver error.
    Metadata,
    /// The driver does not implement the call.
    Unsupported,
    /// The session is lost.
    Connection,
}

/// A fault injected into one metadata request.
#[derive(Debug, Clone, Deserialize)]
pub struct Fault {
    pub request: MetadataRequest,
    pub kind: FaultKind,
    /// Rows delivered before the stream fails; 0 fails the call itself.
    #[serde(default)]
    pub after_rows: usize,
}

/// A captured database.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryFixture {
    #[serde(default = "default_db_type")]
    pub db_type: String,
    #[serde(default)]
    pub metadata: HashMap<MetadataRequest, Vec<FixtureRow>>,
    #[serde(default)]
    pub queries: Vec<QueryFixture>,
    #[serde(default)]
    pub faults: Vec<Fault>,
    /// Delay before every call.
    #[serde(default)]
    pub latency_ms: u64,
}

fn default_db_type() -> String {
    "generic".to_string()
}

impl MemoryFixture {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Add rows for a request.
    pub fn with_rows(mut self, request: MetadataRequest, rows: Vec<MetadataRow>) -> Self {
        let entry = self.metadata.entry(request).or_default();
        for row in rows {
            entry.push(to_fixture_row(&row));
        }
        self
    }

    pub fn with_fault(mut self, request: MetadataRequest, kind: FaultKind, after_rows: usize) -> Self {
        self.faults.push(Fault {
            request,
            kind,
            after_rows,
        });
        self
    }
}

fn to_fixture_row(row: &MetadataRow) -> FixtureRow {
    row.entries()
        .map(|(label, value)| (label.to_string(), value.clone()))
        .collect()
}

/// Connection answering from a [`MemoryFixture`].
#[derive(Debug)]
pub struct MemoryConnection {
    fixture: MemoryFixture,
    closed: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryConnection {
    pub fn new(fixture: MemoryFixture) -> Self {
        Self {
            fixture,
            closed: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(MemoryFixture::from_yaml(yaml)?))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(MemoryFixture::load(path)?))
    }

    /// Number of metadata and query calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Simulate a dropped session; every later call fails.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    async fn enter(&self, what: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fixture.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fixture.latency_ms)).await;
        }
        if self.closed.load(Ordering::Relaxed) {
            return Err(CrawlError::connection("session closed", what.to_string()));
        }
        Ok(())
    }

    fn stream(rows: &[FixtureRow], failure: Option<(usize, CrawlError)>) -> RowStream<'_> {
        let mut items: Vec<Result<MetadataRow>> = rows
            .iter()
            .map(|row| Ok(MetadataRow::from_pairs(row.iter().map(|(k, v)| (k, v.clone())))))
            .collect();
        if let Some((after, err)) = failure {
            items.truncate(after);
            items.push(Err(err));
        }
        stream::iter(items).boxed()
    }
}

fn fault_error(kind: FaultKind, request: MetadataRequest) -> CrawlError {
    match kind {
        FaultKind::Metadata => CrawlError::metadata(request.category(), "injected failure"),
        FaultKind::Unsupported => CrawlError::Unsupported(request.to_string()),
        FaultKind::Connection => CrawlError::connection("injected disconnect", request.to_string()),
    }
}

#[async_trait]
impl MetadataConnection for MemoryConnection {
    fn db_type(&self) -> &str {
        &self.fixture.db_type
    }

    async fn validate(&self) -> Result<()> {
        self.enter("validate").await
    }

    async fn metadata(&self, request: MetadataRequest) -> Result<RowStream<'_>> {
        self.enter(request.as_str()).await?;
        let rows = self
            .fixture
            .metadata
            .get(&request)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let fault = self.fixture.faults.iter().find(|f| f.request == request);
        match fault {
            Some(f) if f.after_rows == 0 => Err(fault_error(f.kind, request)),
            Some(f) => Ok(Self::stream(rows, Some((f.after_rows, fault_error(f.kind, request))))),
            None => {
                debug!("Serving {} fixture rows for {}", rows.len(), request);
                Ok(Self::stream(rows, None))
            }
        }
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<RowStream<'_>> {
        self.enter("query").await?;
        let fixture = self.fixture.queries.iter().find(|q| {
            sql.contains(&q.contains)
                && q.params
                    .as_ref()
                    .map_or(true, |p| p.iter().map(String::as_str).eq(params.iter().copied()))
        });
        match fixture {
            Some(q) => Ok(Self::stream(&q.rows, None)),
            None => Err(CrawlError::Query(format!(
                "no fixture rows for query with parameters {:?}",
                params
            ))),
        }
    }
}
