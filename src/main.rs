//! CLI entry point for the fulltext acquirer.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use fulltext_core::{
    install_tracing, BatchRunner, Config, Identifier, LookupOutcome, ManifestStore, PDFDownloader, Publication,
    SourceKind, WaterfallOrchestrator,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{error, info};

mod cli;

use cli::{Args, Command, ManifestAction};

const EXIT_SUCCESS: u8 = 0;
const EXIT_NOT_FOUND: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_IO_ERROR: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.verbose);

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "configuration invalid");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let result = match args.command {
        Command::Fetch { identifier, skip_sources, download_to } => run_fetch(&config, &identifier, &skip_sources, download_to).await,
        Command::Batch { file, max_concurrent } => run_batch(&config, &file, max_concurrent).await,
        Command::Manifest { action } => run_manifest(&config, action),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::from(EXIT_IO_ERROR)
        }
    }
}

/// Resolves `raw` to an [`Identifier`] using cheap structural heuristics: a
/// `PMID:` prefix, a bare `PMC` prefix, a DOI's `10.` prefix, an arXiv-style
/// `\d{4}\.\d{4,5}` shape, else treated as a free-text title.
fn parse_identifier(raw: &str) -> Identifier {
    let trimmed = raw.trim();
    if let Some(pmid) = trimmed.strip_prefix("PMID:").or_else(|| trimmed.strip_prefix("pmid:")) {
        return Identifier::normalize_pmid(pmid).unwrap_or_else(|_| Identifier::Pmid(pmid.to_string()));
    }
    if trimmed.to_ascii_uppercase().starts_with("PMC") {
        if let Ok(id) = Identifier::normalize_pmcid(trimmed) {
            return id;
        }
    }
    if trimmed.starts_with("10.") {
        if let Ok(id) = Identifier::normalize_doi(trimmed) {
            return id;
        }
    }
    if looks_like_arxiv_id(trimmed) {
        if let Ok(id) = Identifier::normalize_arxiv_id(trimmed) {
            return id;
        }
    }
    Identifier::from_title(trimmed).unwrap_or_else(|_| Identifier::TitleHash(String::new()))
}

fn looks_like_arxiv_id(s: &str) -> bool {
    let digits_dot_digits = s.split_once('.').is_some_and(|(a, b)| {
        a.len() == 4 && a.chars().all(|c| c.is_ascii_digit()) && b.chars().all(|c| c.is_ascii_digit() || c == 'v')
    });
    digits_dot_digits || s.starts_with("arXiv:") || s.starts_with("arxiv:")
}

fn parse_skip_sources(raw: &[String]) -> Vec<SourceKind> {
    raw.iter().filter_map(|s| SourceKind::parse(s.trim())).collect()
}

async fn run_fetch(config: &Config, identifier_raw: &str, skip_sources_raw: &[String], download_to: Option<PathBuf>) -> anyhow::Result<u8> {
    let publication = Publication::new(vec![parse_identifier(identifier_raw)]);
    let skip_sources = parse_skip_sources(skip_sources_raw);

    let orchestrator = WaterfallOrchestrator::new(config);
    let outcome = orchestrator.get_fulltext(&publication, &skip_sources).await;

    match &outcome {
        LookupOutcome::Found { url, source, .. } => {
            info!(source = source.as_str(), url, "resolved");

            if let Some(dir) = download_to {
                std::fs::create_dir_all(&dir)?;
                let downloader = PDFDownloader::new(config);
                let download_outcome = downloader.download(url, &dir, &publication).await;
                println!("{}", json!({"lookup": outcome_json(&outcome), "download": download_outcome_json(&download_outcome)}));
                return Ok(if download_outcome.is_success() { EXIT_SUCCESS } else { EXIT_NOT_FOUND });
            }

            println!("{}", outcome_json(&outcome));
            Ok(EXIT_SUCCESS)
        }
        _ => {
            println!("{}", outcome_json(&outcome));
            Ok(EXIT_NOT_FOUND)
        }
    }
}

async fn run_batch(config: &Config, file: &PathBuf, max_concurrent: Option<usize>) -> anyhow::Result<u8> {
    let reader = std::io::BufReader::new(std::fs::File::open(file)?);
    let identifiers: Vec<String> = reader
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    let publications: Vec<Publication> = identifiers.iter().map(|id| Publication::new(vec![parse_identifier(id)])).collect();

    let orchestrator = Arc::new(WaterfallOrchestrator::new(config));
    let runner = BatchRunner::new(Arc::clone(&orchestrator), max_concurrent.unwrap_or(config.batch_max_concurrent));

    let progress = ProgressBar::new(publications.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcomes = runner.get_fulltext_batch(&publications).await;
    progress.finish_and_clear();

    let stats = runner.statistics();
    let summary: Vec<_> = outcomes.iter().map(outcome_json).collect();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    eprintln!("{} / {} resolved", stats.successes, stats.total_attempts);

    Ok(if stats.successes > 0 { EXIT_SUCCESS } else { EXIT_NOT_FOUND })
}

fn run_manifest(config: &Config, action: ManifestAction) -> anyhow::Result<u8> {
    let store = ManifestStore::new(config.pdf_storage_root_dir.clone());
    match action {
        ManifestAction::Verify { geo_id } => {
            let report = store.verify_all(&geo_id)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.invalid == 0 { EXIT_SUCCESS } else { EXIT_NOT_FOUND })
        }
        ManifestAction::Rebuild { geo_id } => {
            let count = store.rebuild_manifest(&geo_id)?;
            println!("{}", json!({"geo_id": geo_id, "entries_rebuilt": count}));
            Ok(EXIT_SUCCESS)
        }
    }
}

fn outcome_json(outcome: &LookupOutcome) -> serde_json::Value {
    match outcome {
        LookupOutcome::Found { url, source, metadata } => json!({
            "status": "found",
            "url": url,
            "source": source.as_str(),
            "metadata": metadata,
        }),
        LookupOutcome::NotApplicable { reason } => json!({"status": "not_applicable", "reason": reason}),
        LookupOutcome::NotFound => json!({"status": "not_found"}),
        LookupOutcome::TransientError { kind, retry_after } => json!({
            "status": "transient_error",
            "kind": kind,
            "retry_after_seconds": retry_after.map(|d| d.as_secs()),
        }),
        LookupOutcome::PermanentError { kind } => json!({"status": "permanent_error", "kind": kind}),
    }
}

fn download_outcome_json(outcome: &fulltext_core::DownloadOutcome) -> serde_json::Value {
    use fulltext_core::DownloadOutcome;
    match outcome {
        DownloadOutcome::Downloaded { path, sha256, size_bytes, .. } => json!({
            "status": "downloaded",
            "path": path,
            "sha256": sha256,
            "size_bytes": size_bytes,
        }),
        DownloadOutcome::InvalidPdf { reason, bytes_received } => json!({
            "status": "invalid_pdf",
            "reason": reason.to_string(),
            "bytes_received": bytes_received,
        }),
        DownloadOutcome::LandingPage { extracted_pdf_url } => json!({"status": "landing_page", "extracted_pdf_url": extracted_pdf_url}),
        DownloadOutcome::HttpFailure { status, attempt } => json!({"status": "http_failure", "http_status": status, "attempt": attempt}),
        DownloadOutcome::NetworkError { kind, attempt } => json!({"status": "network_error", "kind": kind, "attempt": attempt}),
        DownloadOutcome::Timeout => json!({"status": "timeout"}),
    }
}
