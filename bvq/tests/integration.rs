//! Integration tests for the bvq CLI.
//!
//! These only exercise paths that fail or finish before any request is
//! sent, so they run offline.

use std::process::Command;
use tempfile::TempDir;

fn bvq_cmd(home: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bvq"));
    cmd.env("BVBRC_CONFIG", home.join("config.toml"));
    cmd.env_remove("BVBRC_BASE_URL");
    cmd.env_remove("BVBRC_SOLR_BASE_URL");
    cmd.env_remove("BVBRC_TOKEN");
    cmd
}

#[test]
fn test_collections_lists_id_fields() {
    let tmp = TempDir::new().unwrap();
    let output = bvq_cmd(tmp.path())
        .arg("collections")
        .output()
        .expect("failed to run bvq collections");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 32);
    let genome = stdout
        .lines()
        .find(|l| l.starts_with("genome "))
        .expect("genome row");
    assert!(genome.trim_end().ends_with("genome_id"));
}

#[test]
fn test_unknown_collection_fails() {
    let tmp = TempDir::new().unwrap();
    let output = bvq_cmd(tmp.path())
        .args(["query", "genomes", "--eq", "genus=Escherichia"])
        .output()
        .expect("failed to run bvq query");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: Validation error: unknown collection 'genomes'"));
}

#[test]
fn test_download_requires_sort() {
    let tmp = TempDir::new().unwrap();
    let output = bvq_cmd(tmp.path())
        .args(["query", "genome", "--eq", "genus=Escherichia", "--download"])
        .output()
        .expect("failed to run bvq query");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sort is required"));
}

#[test]
fn test_stream_rejects_zero_rows() {
    let tmp = TempDir::new().unwrap();
    let output = bvq_cmd(tmp.path())
        .args(["stream", "genome_feature", "--rows", "0"])
        .output()
        .expect("failed to run bvq stream");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Validation error"));
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let output = bvq_cmd(tmp.path())
        .args(["stream", "genome", "--config"])
        .arg(&missing)
        .output()
        .expect("failed to run bvq stream");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}

#[test]
fn test_bad_eq_pair_rejected_by_parser() {
    let tmp = TempDir::new().unwrap();
    let output = bvq_cmd(tmp.path())
        .args(["query", "genome", "--eq", "genus"])
        .output()
        .expect("failed to run bvq query");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FIELD=VALUE"));
}
