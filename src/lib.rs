//! Fulltext Acquirer Core Library
//!
//! This library resolves bibliographic identifiers (DOI, PMID, PMCID, arXiv
//! ID) to open-access full-text PDFs, running a waterfall of source adapters
//! and organizing successful downloads into a GEO-centric manifest tree.
//!
//! # Architecture
//!
//! - [`identifier`] - DOI/PMID/PMCID/arXiv ID normalization
//! - [`publication`] - the central `Publication` record and `SourceKind` enum
//! - [`rate_limiter`] - per-source request throttling
//! - [`cache`] - content-addressed on-disk cache for XML and PDF artifacts
//! - [`pdf`] - byte-level PDF structural validation
//! - [`source`] - one adapter per external source, behind a uniform trait
//! - [`download`] - HTTP fetch, landing-page recovery, retry with backoff
//! - [`orchestrator`] - the fixed-priority waterfall across adapters
//! - [`manifest`] - GEO-centric PDF manifest and integrity verification
//! - [`batch`] - bounded-concurrency fan-out across many publications
//! - [`config`] - environment-to-`Config` boundary and logging install

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod cache;
pub mod config;
pub mod download;
pub mod identifier;
pub mod manifest;
pub mod orchestrator;
pub mod pdf;
pub mod publication;
pub mod rate_limiter;
pub mod source;

pub use batch::BatchRunner;
pub use cache::{CacheEntry, CacheError, ContentAddressedCache, ContentMetadata};
pub use config::{install_tracing, Config, ConfigError};
pub use download::{classify_error, DownloadError, DownloadOutcome, FailureType, PDFDownloader, RetryDecision, RetryPolicy};
pub use identifier::{Identifier, InvalidIdentifier};
pub use manifest::{ManifestError, ManifestStore, SaveResult, VerifyAllReport};
pub use orchestrator::{priority_rank, Statistics, StatisticsSnapshot, WaterfallOrchestrator, SOURCE_PRIORITY};
pub use pdf::{Classification, Rejection, ValidationLimits};
pub use publication::{Publication, SourceKind};
pub use rate_limiter::RateLimiter;
pub use source::{AdapterError, LookupOutcome, SourceAdapter, SourceRegistry};
