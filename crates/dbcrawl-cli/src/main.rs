//! dbcrawl CLI - crawl database metadata into a catalog.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use dbcrawl::catalog::Section;
use dbcrawl::core::attributes::{FILTERED_OUT, FILTERED_REFERENCE, NO_GREP_MATCH};
use dbcrawl::core::{Schema, Table};
use dbcrawl::{
    drivers, Catalog, CatalogObject, Config, CrawlError, CrawlOptions, DetailLevels,
    SchemaCrawler, TraversalHandler, Traverser,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbcrawl")]
#[command(about = "Crawl database metadata into a schema catalog")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "dbcrawl.yaml")]
    config: PathBuf,

    /// Output JSON to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the configured database
    Crawl {
        /// Override the detail level
        #[arg(long)]
        level: Option<String>,

        /// Print an outline of the catalog
        #[arg(long)]
        outline: bool,
    },

    /// Show the retrieval plan without retrieving anything
    Plan {
        /// Override the detail level
        #[arg(long)]
        level: Option<String>,
    },

    /// List detail levels and their fields
    Levels,

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CrawlError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    // Levels only needs a config for custom level definitions.
    if let Commands::Levels = cli.command {
        let levels = if cli.config.exists() {
            Config::load(&cli.config)?.crawl.detail_levels()?
        } else {
            DetailLevels::builtin()
        };
        return print_levels(&levels, cli.output_json);
    }

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Levels => unreachable!(), // Handled above
        Commands::Crawl { level, outline } => {
            let mut options = CrawlOptions::from_config(&config)?;
            if let Some(level) = level {
                options = options.with_level(level);
            }
            let crawler = SchemaCrawler::with_builtins(options);
            let connection = drivers::connect(&config.connection).await?;
            let cancel_token = setup_signal_handler();

            let outcome = crawler.crawl(connection.as_ref(), cancel_token).await?;
            let report = &outcome.report;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("\nCrawl completed!");
                println!("  Run ID: {}", report.run_id);
                println!("  Database: {} ({} descriptor)", report.database_type, report.descriptor);
                println!("  Detail level: {}", report.detail_level);
                println!("  Duration: {:.2}s", report.duration_seconds);
                for (category, count) in &report.counts {
                    println!("  {}: {}", category, count);
                }
                for skipped in &report.skipped_categories {
                    println!("  Skipped {}: {}", skipped.category, skipped.reason);
                }
                if report.dropped_references > 0 {
                    println!("  Dropped references: {}", report.dropped_references);
                }
                println!("  Fingerprint: {}", report.fingerprint);
            }

            if outline {
                let mut printer = OutlinePrinter::default();
                Traverser::new(&outcome.catalog, config.crawl.sort.traversal_options())
                    .traverse(&mut printer)?;
                print!("{}", printer.output);
            }
        }

        Commands::Plan { level } => {
            let mut options = CrawlOptions::from_config(&config)?;
            if let Some(level) = level {
                options = options.with_level(level);
            }
            let crawler = SchemaCrawler::with_builtins(options);
            let connection = drivers::connect(&config.connection).await?;
            let (descriptor, plan) = crawler.plan(connection.as_ref())?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!("Retrieval plan ({} descriptor, level {}):", descriptor.name(), plan.level);
                for phase in &plan.phases {
                    let requests: Vec<String> =
                        phase.steps.iter().map(|s| s.request.to_string()).collect();
                    println!("  {}: {}", phase.category, requests.join(", "));
                }
                for category in &plan.unsupported {
                    println!("  {}: unsupported", category);
                }
            }
        }

        Commands::HealthCheck => {
            let start = Instant::now();
            let connection = drivers::connect(&config.connection).await?;
            let result = connection.validate().await;
            let latency_ms = start.elapsed().as_millis() as u64;

            if cli.output_json {
                let json = serde_json::json!({
                    "database_type": connection.db_type(),
                    "target": config.connection.display_target(),
                    "connected": result.is_ok(),
                    "latency_ms": latency_ms,
                    "error": result.as_ref().err().map(|e| e.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  {} ({}): {} ({}ms)",
                    config.connection.display_target(),
                    connection.db_type(),
                    if result.is_ok() { "OK" } else { "FAILED" },
                    latency_ms
                );
                if let Err(ref err) = result {
                    println!("    Error: {}", err);
                }
            }
            result?;
        }
    }

    Ok(())
}

fn print_levels(levels: &DetailLevels, json: bool) -> Result<(), CrawlError> {
    if json {
        println!("{}", serde_json::to_string_pretty(levels)?);
        return Ok(());
    }
    for level in levels.iter() {
        let fields: Vec<&str> = level.fields.iter().map(|f| f.as_str()).collect();
        println!("{} ({} fields)", level.name, fields.len());
        println!("  {}", fields.join(", "));
    }
    Ok(())
}

/// Indented text outline of a catalog.
#[derive(Default)]
struct OutlinePrinter {
    output: String,
}

impl TraversalHandler for OutlinePrinter {
    fn section_start(&mut self, schema: Option<&Schema>, section: Section) -> dbcrawl::Result<()> {
        if section == Section::Tables {
            let name = schema.map(|s| s.full_name()).unwrap_or_default();
            self.output.push_str(&format!("{}\n", name));
        }
        Ok(())
    }

    fn handle(&mut self, catalog: &Catalog, object: CatalogObject<'_>) -> dbcrawl::Result<()> {
        let line = match object {
            CatalogObject::Table(table) => {
                let mut lines = match catalog.columns(table) {
                    Ok(columns) => format!("  table {} ({} columns)\n", table.name, columns.len()),
                    Err(_) => format!("  table {} (columns not loaded)\n", table.name),
                };
                lines.push_str(&foreign_key_lines(catalog, table));
                lines
            }
            CatalogObject::Routine(routine) => format!("  routine {}\n", routine.name),
            CatalogObject::Sequence(sequence) => format!("  sequence {}\n", sequence.name),
            CatalogObject::Synonym(synonym) => format!("  synonym {}\n", synonym.name),
            CatalogObject::ColumnDataType(_) => return Ok(()),
        };
        self.output.push_str(&line);
        Ok(())
    }
}

/// One line per imported foreign key. References into tables the grep filter
/// dropped are left out; tables outside the inclusion rules show as detached.
fn foreign_key_lines(catalog: &Catalog, table: &Table) -> String {
    let Ok(foreign_keys) = catalog.imported_foreign_keys(table) else {
        return String::new();
    };
    let mut lines = String::new();
    for fk in foreign_keys {
        let Some(target) = catalog.referenced_table(fk) else {
            continue;
        };
        if target.attributes.flag(NO_GREP_MATCH) {
            continue;
        }
        let detached =
            target.attributes.flag(FILTERED_OUT) || fk.attributes.flag(FILTERED_REFERENCE);
        lines.push_str(&format!(
            "    foreign key {} -> {}{}\n",
            fk.name,
            catalog.table_full_name(target),
            if detached { " (filtered)" } else { "" }
        ));
    }
    lines
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the crawl on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            match signal(kind) {
                Ok(mut stream) => {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Cancelling crawl...", name);
                    token.cancel();
                }
                Err(e) => eprintln!("Failed to set up {} handler: {}", name, e),
            }
        });
    }

    cancel_token
}

/// Cancel the crawl on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling crawl...");
            token.cancel();
        }
    });

    cancel_token
}
