//! Crawl orchestrator: plan, retrieve, link, filter, freeze, analyze.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{Analyzer, AnalyzerOptions};
use crate::builder::CatalogBuilder;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::core::attributes::NO_GREP_MATCH;
use crate::core::load::Loaded;
use crate::core::registry::DriverRegistry;
use crate::core::traits::{CapabilityDescriptor, MetadataConnection};
use crate::error::{CrawlError, Result};
use crate::retrieve::{run_phase, GrepFilter, InclusionRules, RetrievalContext};
use crate::strategy::{DetailLevels, ObjectCategory, RetrievalPlan};

/// Everything a crawl needs besides the connection.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub level: String,
    pub levels: DetailLevels,
    pub inclusion: InclusionRules,
    pub grep: Option<GrepFilter>,
    pub weak_associations: bool,
    /// Deadline for the whole crawl.
    pub timeout: Option<Duration>,
    pub allow_generic_fallback: bool,
    /// Identifies the configuration in the report.
    pub config_hash: Option<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            level: "standard".to_string(),
            levels: DetailLevels::builtin(),
            inclusion: InclusionRules::default(),
            grep: None,
            weak_associations: true,
            timeout: None,
            allow_generic_fallback: false,
            config_hash: None,
        }
    }
}

impl CrawlOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let crawl = &config.crawl;
        Ok(Self {
            level: crawl.detail_level.clone(),
            levels: crawl.detail_levels()?,
            inclusion: crawl.inclusion_rules()?,
            grep: crawl.grep_filter()?,
            weak_associations: crawl.weak_associations,
            timeout: crawl.timeout_secs.map(Duration::from_secs),
            allow_generic_fallback: crawl.allow_generic_fallback,
            config_hash: Some(config.hash()),
        })
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// A category that was requested but not retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCategory {
    pub category: ObjectCategory,
    pub reason: String,
}

/// Summary of a crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Family reported by the connection.
    pub database_type: String,

    /// Descriptor used for the crawl.
    pub descriptor: String,

    pub detail_level: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    /// Phases that completed, in run order.
    pub completed_phases: Vec<ObjectCategory>,

    /// Failed and unsupported categories.
    pub skipped_categories: Vec<SkippedCategory>,

    /// Foreign keys dropped because an endpoint never appeared.
    pub dropped_references: usize,

    /// Tables marked by the grep filter.
    pub grep_excluded_tables: usize,

    /// Objects per category.
    pub counts: BTreeMap<String, usize>,

    /// SHA-256 of the catalog.
    pub fingerprint: String,
}

impl CrawlReport {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_complete(&self) -> bool {
        self.skipped_categories.is_empty() && self.dropped_references == 0
    }
}

/// Result of a successful crawl.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub catalog: Catalog,
    pub report: CrawlReport,
}

/// Runs crawls against metadata connections.
///
/// The crawler holds no per-session state, so one instance can crawl several
/// connections concurrently.
#[derive(Debug)]
pub struct SchemaCrawler {
    registry: Arc<DriverRegistry>,
    options: CrawlOptions,
}

impl SchemaCrawler {
    pub fn new(registry: Arc<DriverRegistry>, options: CrawlOptions) -> Self {
        Self { registry, options }
    }

    /// Crawler with the built-in descriptors.
    pub fn with_builtins(options: CrawlOptions) -> Self {
        Self::new(Arc::new(DriverRegistry::with_builtins()), options)
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Descriptor and plan for a connection, without retrieving anything.
    pub fn plan(
        &self,
        connection: &dyn MetadataConnection,
    ) -> Result<(Arc<dyn CapabilityDescriptor>, RetrievalPlan)> {
        let descriptor = self
            .registry
            .resolve(connection.db_type(), self.options.allow_generic_fallback)?;
        let plan = RetrievalPlan::build(
            &self.options.levels,
            &self.options.level,
            descriptor.as_ref(),
        )?;
        Ok((descriptor, plan))
    }

    /// Crawl one connection.
    ///
    /// A failed category is rolled back and reported; a lost connection,
    /// cancellation, or timeout aborts the crawl without a catalog.
    pub async fn crawl(
        &self,
        connection: &dyn MetadataConnection,
        cancel: CancellationToken,
    ) -> Result<CrawlOutcome> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let (descriptor, plan) = self.plan(connection)?;
        info!(
            "Starting crawl {}: {} via {} descriptor at level {}",
            run_id,
            connection.db_type(),
            descriptor.name(),
            plan.level
        );

        connection.validate().await?;

        let mut builder = CatalogBuilder::new(descriptor.identifier_rules(), plan.fields.clone());
        for category in &plan.unsupported {
            info!("Skipping {}: not supported by {}", category, descriptor.name());
            builder.mark_unsupported(*category);
        }

        let mut ctx = RetrievalContext::new(
            connection,
            descriptor.as_ref(),
            &self.options.inclusion,
            cancel.clone(),
        );
        let mut completed_phases = Vec::new();
        let total = plan.phases.len();

        for (i, phase) in plan.phases.iter().enumerate() {
            self.check_interrupted(&cancel, clock)?;
            info!("Phase {}/{}: {}", i + 1, total, phase.category);

            if let Some(missing) = builder.unmet_prerequisite(phase.category) {
                warn!("Skipping {}: {} not retrieved", phase.category, missing);
                builder.skip_phase(phase.category, format!("{} not retrieved", missing))?;
                continue;
            }

            let checkpoint = builder.begin_phase(phase.category)?;
            let result = match self.remaining(clock) {
                Some(remaining) => {
                    match tokio::time::timeout(remaining, run_phase(&mut ctx, &mut builder, phase))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(self.timeout_error()),
                    }
                }
                None => run_phase(&mut ctx, &mut builder, phase).await,
            };

            match result {
                Ok(()) => {
                    builder.complete_phase(checkpoint)?;
                    completed_phases.push(phase.category);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping {}: {}", phase.category, e);
                    builder.fail_phase(checkpoint, e.to_string())?;
                }
            }
        }
        self.check_interrupted(&cancel, clock)?;
        debug!("Probed {} data types for enumerated values", ctx.probed_types());

        let dropped = builder.resolve_deferred()?;
        if dropped > 0 {
            warn!("Dropped {} unresolved foreign key references", dropped);
        }

        let grep_excluded_tables = match &self.options.grep {
            Some(grep) => apply_grep(&mut builder, grep)?,
            None => 0,
        };

        let catalog = builder.freeze()?;
        let catalog = Analyzer::new(AnalyzerOptions {
            weak_associations: self.options.weak_associations,
        })
        .analyze(catalog)?;

        let completed_at = Utc::now();
        let report = CrawlReport {
            run_id,
            database_type: connection.db_type().to_string(),
            descriptor: descriptor.name().to_string(),
            detail_level: plan.level.clone(),
            config_hash: self.options.config_hash.clone(),
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            completed_phases,
            skipped_categories: catalog
                .skipped_categories()
                .into_iter()
                .map(|(category, reason)| SkippedCategory { category, reason })
                .collect(),
            dropped_references: catalog.dropped_references(),
            grep_excluded_tables,
            counts: catalog
                .counts()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            fingerprint: catalog.fingerprint()?,
        };

        info!(
            "Crawl {} finished in {:.1}s: {} tables, {} skipped categories",
            report.run_id,
            report.duration_seconds,
            report.counts.get("tables").copied().unwrap_or(0),
            report.skipped_categories.len()
        );

        Ok(CrawlOutcome { catalog, report })
    }

    fn check_interrupted(&self, cancel: &CancellationToken, clock: Instant) -> Result<()> {
        if cancel.is_cancelled() {
            info!("Cancellation requested, abandoning crawl");
            return Err(CrawlError::Cancelled);
        }
        if self.remaining(clock).is_some_and(|r| r.is_zero()) {
            return Err(self.timeout_error());
        }
        Ok(())
    }

    fn remaining(&self, clock: Instant) -> Option<Duration> {
        self.options
            .timeout
            .map(|limit| limit.saturating_sub(clock.elapsed()))
    }

    fn timeout_error(&self) -> CrawlError {
        CrawlError::Timeout(self.options.timeout.map(|t| t.as_secs()).unwrap_or(0))
    }
}

/// Mark tables rejected by the grep filter. Returns the number marked.
fn apply_grep(builder: &mut CatalogBuilder, grep: &GrepFilter) -> Result<usize> {
    let mut rejected = Vec::new();
    for id in builder.table_ids() {
        let Some(table) = builder.table(id) else {
            continue;
        };
        if table.partial {
            continue;
        }
        let Loaded::Present(column_ids) = &table.columns else {
            debug!("Grep skipped {}: columns not loaded", table.name);
            continue;
        };
        let prefix = match builder.schema(table.schema).map(|s| s.full_name()) {
            Some(schema) if !schema.is_empty() => format!("{}.{}", schema, table.name),
            _ => table.name.clone(),
        };
        let names: Vec<String> = column_ids
            .iter()
            .filter_map(|c| builder.column(*c))
            .map(|c| format!("{}.{}", prefix, c.name))
            .collect();
        if !grep.keeps(names.iter().map(String::as_str)) {
            rejected.push(id);
        }
    }

    for id in &rejected {
        builder.set_table_attribute(*id, NO_GREP_MATCH, true)?;
    }
    if !rejected.is_empty() {
        info!("Grep filter excluded {} tables", rejected.len());
    }
    Ok(rejected.len())
}
