//! End-to-end CLI tests for the `fulltext-acquirer` binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_displays_usage() {
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve bibliographic identifiers"));
}

#[test]
fn version_displays_version() {
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fulltext-acquirer"));
}

#[test]
fn missing_subcommand_fails() {
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.assert().failure();
}

#[test]
fn unknown_flag_fails() {
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.arg("--not-a-real-flag").assert().failure();
}

#[test]
fn fetch_with_only_a_gray_area_source_and_no_mirrors_is_not_found() {
    // Cache/institutional/pmc/etc all default on, but none of them can resolve
    // a DOI that does not exist anywhere and has no network in this sandbox,
    // so this exercises the full waterfall down to `NotFound` without needing
    // a live network. We keep the fixture identifier nonsensical on purpose.
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.env("FULLTEXT_ENABLE_INSTITUTIONAL", "false")
        .env("FULLTEXT_ENABLE_PMC", "false")
        .env("FULLTEXT_ENABLE_UNPAYWALL", "false")
        .env("FULLTEXT_ENABLE_CORE", "false")
        .env("FULLTEXT_ENABLE_OPENALEX", "false")
        .env("FULLTEXT_ENABLE_CROSSREF", "false")
        .env("FULLTEXT_ENABLE_BIORXIV", "false")
        .env("FULLTEXT_ENABLE_ARXIV", "false")
        .env("FULLTEXT_ENABLE_CACHE", "false")
        .arg("fetch")
        .arg("10.9999/does-not-exist")
        .assert()
        .failure()
        .stdout(predicate::str::contains("not_found"));
}

#[test]
fn manifest_verify_on_empty_geo_reports_zero_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.env("FULLTEXT_PDF_STORAGE_ROOT_DIR", dir.path())
        .arg("manifest")
        .arg("verify")
        .arg("GSE_EMPTY")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 0"));
}

#[test]
fn manifest_rebuild_on_empty_geo_reports_zero_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("fulltext-acquirer").unwrap();
    cmd.env("FULLTEXT_PDF_STORAGE_ROOT_DIR", dir.path())
        .arg("manifest")
        .arg("rebuild")
        .arg("GSE_EMPTY")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"entries_rebuilt\": 0"));
}
