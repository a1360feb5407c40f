//! Unit tests for CLI commands

use crate::cli::{execute, Cli};
use clap::Parser;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_spec_is_required() {
    assert!(Cli::try_parse_from(["crudgen"]).is_err());
}

#[test]
fn test_defaults() {
    let cli = Cli::try_parse_from(["crudgen", "--spec", "shop.json"]).unwrap();
    assert_eq!(cli.spec.to_string_lossy(), "shop.json");
    assert_eq!(cli.root.to_string_lossy(), ".");
    assert!(!cli.clean);
    assert!(!cli.dry_run);
}

#[test]
fn test_all_flags_parse() {
    let cli = Cli::try_parse_from([
        "crudgen",
        "-s",
        "shop.json",
        "--config",
        "gen.json",
        "--root",
        "backend",
        "--clean",
        "--dry-run",
    ])
    .unwrap();
    assert_eq!(cli.config.unwrap().to_string_lossy(), "gen.json");
    assert_eq!(cli.root.to_string_lossy(), "backend");
    assert!(cli.clean);
    assert!(cli.dry_run);
}

#[test]
fn test_execute_missing_spec_fails() {
    let dir = TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "crudgen",
        "--spec",
        dir.path().join("nope.json").to_str().unwrap(),
        "--root",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    let err = execute(&cli).unwrap_err();
    assert!(format!("{err:#}").contains("cannot open spec"));
}

#[test]
fn test_execute_generates_and_reports_mount() {
    let dir = TempDir::new().unwrap();
    let spec = dir.path().join("shop.json");
    fs::write(
        &spec,
        r#"[{"className": "Widget", "tableName": "t_widget",
             "fields": [{"name": "title", "type": "String", "length": 64}]}]"#,
    )
    .unwrap();
    let cli = Cli::try_parse_from([
        "crudgen",
        "--spec",
        spec.to_str().unwrap(),
        "--root",
        dir.path().to_str().unwrap(),
    ])
    .unwrap();
    let report = execute(&cli).unwrap();
    assert_eq!(report.mount_import, "from app.api.router import api_router");
    assert!(dir.path().join("app/models/biz/widget.py").exists());
}
