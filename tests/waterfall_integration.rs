//! Integration tests exercising the orchestrator, cache, download, and
//! manifest layers together through their public APIs, rather than in
//! isolation as the per-module unit tests do.

use std::sync::Arc;

use fulltext_core::{
    BatchRunner, Config, Identifier, LookupOutcome, ManifestStore, PDFDownloader, Publication, SourceKind,
    WaterfallOrchestrator,
};
use md5::{Digest, Md5};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn no_network_config() -> Config {
    let mut config = Config::default();
    config.enable_institutional = false;
    config.enable_pmc = false;
    config.enable_unpaywall = false;
    config.enable_core = false;
    config.enable_crossref = false;
    config.enable_biorxiv = false;
    config.enable_arxiv = false;
    config.enable_openalex = false;
    config
}

fn md5_hex(s: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[tokio::test]
async fn cache_hit_short_circuits_every_other_source() {
    let cache_dir = tempfile::tempdir().unwrap();
    let mut config = no_network_config();
    config.cache_root_dir = cache_dir.path().to_path_buf();

    let publication = Publication::new(vec![Identifier::Doi("10.1/cached-paper".to_string())]);
    let cache_key = publication.primary_cache_key().unwrap();
    let digest = md5_hex(&cache_key);

    let source_dir = cache_dir.path().join("pdf").join("unpaywall");
    std::fs::create_dir_all(&source_dir).unwrap();
    std::fs::write(source_dir.join(format!("{digest}.pdf")), b"%PDF-1.4 fake %%EOF").unwrap();

    let orchestrator = WaterfallOrchestrator::new(&config);
    let outcome = orchestrator.get_fulltext(&publication, &[]).await;

    match outcome {
        LookupOutcome::Found { source, url, .. } => {
            assert_eq!(source, SourceKind::Cache);
            assert!(url.starts_with("file://"));
        }
        other => panic!("expected Found via Cache, got {other:?}"),
    }

    let stats = orchestrator.statistics();
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.by_source.get("cache"), Some(&1));
}

#[tokio::test]
async fn skip_sources_forces_the_waterfall_past_a_previously_tried_source() {
    let mut config = no_network_config();
    config.enable_openalex = true;
    let orchestrator = WaterfallOrchestrator::new(&config);

    // No DOI/PMID/PMCID — only OpenAlexOa (metadata-only, no network) can ever
    // resolve this publication. Skipping it must therefore yield NotFound even
    // though it would otherwise succeed.
    let publication = Publication::new(vec![]).with_oa_url("https://example.org/paper.pdf");

    let first = orchestrator.get_fulltext(&publication, &[]).await;
    assert!(matches!(first, LookupOutcome::Found { source: SourceKind::OpenAlexOa, .. }));

    let retried = orchestrator.get_fulltext(&publication, &[SourceKind::OpenAlexOa]).await;
    assert!(matches!(retried, LookupOutcome::NotFound));
}

#[tokio::test]
async fn batch_runner_preserves_input_order_regardless_of_completion_order() {
    let config = no_network_config();
    let orchestrator = Arc::new(WaterfallOrchestrator::new(&config));
    let runner = BatchRunner::new(Arc::clone(&orchestrator), 3);

    // None of these are resolvable (no sources enabled that can reach them),
    // but the returned vector must still line up 1:1 with the input order.
    let publications: Vec<Publication> = (0..5)
        .map(|i| Publication::new(vec![Identifier::Doi(format!("10.1/paper-{i}"))]))
        .collect();

    let outcomes = runner.get_fulltext_batch(&publications).await;

    assert_eq!(outcomes.len(), publications.len());
    for outcome in &outcomes {
        assert!(matches!(outcome, LookupOutcome::NotFound));
    }

    let stats = runner.statistics();
    assert_eq!(stats.total_attempts, 5);
    assert_eq!(stats.failures, 5);
}

#[tokio::test]
async fn download_then_manifest_save_round_trips_a_real_pdf() {
    let server = MockServer::start().await;
    let body = {
        let mut b = b"%PDF-1.4 ".to_vec();
        b.resize(400, b'x');
        b.extend_from_slice(b"%%EOF");
        b
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.min_pdf_size_bytes = 100;
    config.max_pdf_size_bytes = 1_000_000;

    let download_dir = tempfile::tempdir().unwrap();
    let downloader = PDFDownloader::new(&config);
    let publication = Publication::new(vec![Identifier::Pmid("999".to_string())]);
    let download_outcome = downloader.download(&server.uri(), download_dir.path(), &publication).await;

    let downloaded_path = match download_outcome {
        fulltext_core::DownloadOutcome::Downloaded { path, sha256, .. } => {
            assert_eq!(sha256.len(), 64);
            path
        }
        other => panic!("expected Downloaded, got {other:?}"),
    };

    let manifest_base = tempfile::tempdir().unwrap();
    let store = ManifestStore::new(manifest_base.path());
    let save_result = store.save("GSE_ROUNDTRIP", "999", &downloaded_path).await.unwrap();
    assert!(save_result.verified);

    let report = store.verify_all("GSE_ROUNDTRIP").unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.invalid, 0);
}
