//! CLI integration tests for dbcrawl.
//!
//! These tests verify argument parsing, exit codes, and end-to-end crawls
//! against captured metadata served by the in-memory driver.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the dbcrawl binary.
fn cmd() -> Command {
    Command::cargo_bin("dbcrawl").unwrap()
}

const FIXTURE: &str = r#"
db_type: postgres
metadata:
  schemas:
    - { schema_name: public }
    - { schema_name: pg_catalog }
  tables:
    - { schema_name: public, table_name: customer, table_type: TABLE }
    - { schema_name: public, table_name: orders, table_type: TABLE }
  columns:
    - { schema_name: public, table_name: customer, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false }
    - { schema_name: public, table_name: orders, column_name: id, ordinal_position: 1, type_name: int4, is_nullable: false }
    - { schema_name: public, table_name: orders, column_name: customer_id, ordinal_position: 2, type_name: int4, is_nullable: false }
  primary_keys:
    - { schema_name: public, table_name: customer, column_name: id, key_seq: 1, pk_name: customer_pkey }
    - { schema_name: public, table_name: orders, column_name: id, key_seq: 1, pk_name: orders_pkey }
  foreign_keys:
    - { fk_name: orders_customer_fk, pktable_schem: public, pktable_name: customer, pkcolumn_name: id, fktable_schem: public, fktable_name: orders, fkcolumn_name: customer_id, key_seq: 1 }
"#;

/// Write a fixture and a config pointing at it; returns the config path.
fn memory_config(dir: &TempDir, crawl: &str) -> std::path::PathBuf {
    let fixture = dir.path().join("fixture.yaml");
    std::fs::write(&fixture, FIXTURE).unwrap();
    let config = dir.path().join("dbcrawl.yaml");
    let yaml = format!(
        "connection:\n  type: memory\n  fixture: {}\n{}",
        fixture.display(),
        crawl
    );
    std::fs::write(&config, yaml).unwrap();
    config
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("crawl"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("levels"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_crawl_subcommand_help() {
    cmd()
        .args(["crawl", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--level"))
        .stdout(predicate::str::contains("--outline"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dbcrawl"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: dbcrawl.yaml]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error, not a config error
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", path_arg(file.path()), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_connection_exits_with_code_2() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "crawl:").unwrap();
    writeln!(file, "  detail_level: minimum").unwrap();

    cmd()
        .args(["--config", path_arg(file.path()), "crawl"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_level_exits_with_code_2() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "");

    cmd()
        .args(["--config", path_arg(&config), "crawl", "--level", "exhaustive"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("exhaustive"));
}

// =============================================================================
// Commands Against a Fixture
// =============================================================================

#[test]
fn test_levels_without_config_lists_builtins() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("none.yaml");

    cmd()
        .args(["--config", path_arg(&missing), "levels"])
        .assert()
        .success()
        .stdout(predicate::str::contains("minimum"))
        .stdout(predicate::str::contains("standard"))
        .stdout(predicate::str::contains("detailed"))
        .stdout(predicate::str::contains("maximum"));
}

#[test]
fn test_health_check_memory() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "");

    cmd()
        .args(["--config", path_arg(&config), "health-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_plan_lists_phases() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "crawl:\n  detail_level: minimum\n");

    cmd()
        .args(["--config", path_arg(&config), "plan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres descriptor"))
        .stdout(predicate::str::contains("tables"));
}

#[test]
fn test_crawl_outputs_report_json() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "");

    let output = cmd()
        .args(["--config", path_arg(&config), "--output-json", "crawl"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["database_type"], "postgres");
    assert_eq!(report["detail_level"], "standard");
    assert_eq!(report["counts"]["tables"], 2);
    assert!(report["fingerprint"].as_str().unwrap().len() == 64);
}

#[test]
fn test_crawl_outline_respects_table_filter() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(
        &dir,
        "crawl:\n  tables:\n    exclude: [\"orders\"]\n",
    );

    cmd()
        .args(["--config", path_arg(&config), "crawl", "--outline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table customer (1 columns)"))
        .stdout(predicate::str::contains("table orders").not());
}

#[test]
fn test_crawl_outline_shows_foreign_keys() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "");

    cmd()
        .args(["--config", path_arg(&config), "crawl", "--outline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table orders (2 columns)"))
        .stdout(predicate::str::contains(
            "foreign key orders_customer_fk -> public.customer\n",
        ));
}

#[test]
fn test_crawl_outline_marks_excluded_reference_detached() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(
        &dir,
        "crawl:\n  tables:\n    exclude: [\"customer\"]\n",
    );

    cmd()
        .args(["--config", path_arg(&config), "crawl", "--outline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table customer").not())
        .stdout(predicate::str::contains(
            "foreign key orders_customer_fk -> public.customer (filtered)",
        ));
}

#[test]
fn test_crawl_outline_skips_reference_without_grep_match() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(
        &dir,
        "crawl:\n  grep:\n    columns: \"public\\\\.orders\\\\..*\"\n",
    );

    cmd()
        .args(["--config", path_arg(&config), "crawl", "--outline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table orders (2 columns)"))
        .stdout(predicate::str::contains("table customer").not())
        .stdout(predicate::str::contains("-> public.customer").not());
}

#[test]
fn test_crawl_outline_minimum_level_columns_not_loaded() {
    let dir = TempDir::new().unwrap();
    let config = memory_config(&dir, "");

    cmd()
        .args([
            "--config",
            path_arg(&config),
            "crawl",
            "--outline",
            "--level",
            "minimum",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("table customer (columns not loaded)"))
        .stdout(predicate::str::contains("0 columns").not());
}
