//! Configuration: the single boundary where environment and defaults merge
//! into a typed, immutable [`Config`].
//!
//! No adapter, downloader, or orchestrator code reads an environment
//! variable itself. [`Config::from_env`] reads every `FULLTEXT_*` variable
//! exactly once; everything downstream takes a `&Config`.

use std::path::PathBuf;

use thiserror::Error;

use crate::pdf::{DEFAULT_MAX_PDF_SIZE, DEFAULT_MIN_PDF_SIZE};

const DEFAULT_TIMEOUT_PER_SOURCE_SECONDS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 5;
const DEFAULT_BATCH_MAX_CONCURRENT: usize = 3;
const DEFAULT_NCBI_RATE: f64 = 3.0;
const NCBI_API_KEY_RATE: f64 = 10.0;

/// Cross-field invariant violations caught by [`Config::validate`].
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("unpaywall_email is required when enable_unpaywall is set\n  Suggestion: set FULLTEXT_UNPAYWALL_EMAIL or disable enable_unpaywall")]
    MissingUnpaywallEmail,

    #[error("institutional_proxy_suffix is required when enable_institutional is set\n  Suggestion: set FULLTEXT_INSTITUTIONAL_PROXY_SUFFIX or disable enable_institutional")]
    MissingInstitutionalProxySuffix,

    #[error("min_pdf_size_bytes ({min}) must be less than max_pdf_size_bytes ({max})\n  Suggestion: widen the PDF validation bounds")]
    InvalidPdfSizeBounds { min: usize, max: usize },

    #[error("{field} must be at least 1, got {value}\n  Suggestion: raise the configured value above zero")]
    MustBePositive { field: &'static str, value: i64 },
}

/// Merged, validated configuration for every component in the crate.
///
/// Construct with [`Config::from_env`] at a process boundary (the CLI's
/// `main`), or with [`Config::default`] plus setters in tests and library
/// embeddings that have their own configuration source.
#[derive(Debug, Clone)]
pub struct Config {
    pub enable_cache: bool,
    pub enable_institutional: bool,
    pub enable_pmc: bool,
    pub enable_openalex: bool,
    pub enable_unpaywall: bool,
    pub enable_core: bool,
    pub enable_biorxiv: bool,
    pub enable_arxiv: bool,
    pub enable_crossref: bool,
    pub enable_scihub: bool,
    pub enable_libgen: bool,

    pub unpaywall_email: Option<String>,
    pub core_api_key: Option<String>,
    pub ncbi_api_key: Option<String>,
    pub institutional_proxy_suffix: Option<String>,

    pub timeout_per_source_seconds: u64,
    pub max_retries: u32,
    pub max_concurrent_downloads: usize,
    pub batch_max_concurrent: usize,

    pub min_pdf_size_bytes: usize,
    pub max_pdf_size_bytes: usize,

    pub cache_root_dir: PathBuf,
    pub pdf_storage_root_dir: PathBuf,

    pub scihub_mirrors: Vec<String>,
    pub libgen_mirrors: Vec<String>,

    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_cache: true,
            enable_institutional: false,
            enable_pmc: true,
            enable_openalex: true,
            enable_unpaywall: false,
            enable_core: false,
            enable_biorxiv: true,
            enable_arxiv: true,
            enable_crossref: true,
            enable_scihub: false,
            enable_libgen: false,

            unpaywall_email: None,
            core_api_key: None,
            ncbi_api_key: None,
            institutional_proxy_suffix: None,

            timeout_per_source_seconds: DEFAULT_TIMEOUT_PER_SOURCE_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            batch_max_concurrent: DEFAULT_BATCH_MAX_CONCURRENT,

            min_pdf_size_bytes: DEFAULT_MIN_PDF_SIZE,
            max_pdf_size_bytes: DEFAULT_MAX_PDF_SIZE,

            cache_root_dir: PathBuf::from("./cache"),
            pdf_storage_root_dir: PathBuf::from("./pdfs"),

            scihub_mirrors: Vec::new(),
            libgen_mirrors: Vec::new(),

            accept_invalid_certs: true,
        }
    }
}

impl Config {
    /// Reads every `FULLTEXT_*` environment variable once, falling back to
    /// [`Config::default`] for anything unset. This is the only place in the
    /// crate that touches `std::env`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.enable_cache = env_bool("FULLTEXT_ENABLE_CACHE", config.enable_cache);
        config.enable_institutional = env_bool("FULLTEXT_ENABLE_INSTITUTIONAL", config.enable_institutional);
        config.enable_pmc = env_bool("FULLTEXT_ENABLE_PMC", config.enable_pmc);
        config.enable_openalex = env_bool("FULLTEXT_ENABLE_OPENALEX", config.enable_openalex);
        config.enable_unpaywall = env_bool("FULLTEXT_ENABLE_UNPAYWALL", config.enable_unpaywall);
        config.enable_core = env_bool("FULLTEXT_ENABLE_CORE", config.enable_core);
        config.enable_biorxiv = env_bool("FULLTEXT_ENABLE_BIORXIV", config.enable_biorxiv);
        config.enable_arxiv = env_bool("FULLTEXT_ENABLE_ARXIV", config.enable_arxiv);
        config.enable_crossref = env_bool("FULLTEXT_ENABLE_CROSSREF", config.enable_crossref);
        config.enable_scihub = env_bool("FULLTEXT_ENABLE_SCIHUB", config.enable_scihub);
        config.enable_libgen = env_bool("FULLTEXT_ENABLE_LIBGEN", config.enable_libgen);

        config.unpaywall_email = std::env::var("FULLTEXT_UNPAYWALL_EMAIL").ok();
        config.core_api_key = std::env::var("FULLTEXT_CORE_API_KEY").ok();
        config.ncbi_api_key = std::env::var("FULLTEXT_NCBI_API_KEY").ok();
        config.institutional_proxy_suffix = std::env::var("FULLTEXT_INSTITUTIONAL_PROXY_SUFFIX").ok();

        config.timeout_per_source_seconds =
            env_u64("FULLTEXT_TIMEOUT_PER_SOURCE_SECONDS", config.timeout_per_source_seconds);
        config.max_retries = env_u64("FULLTEXT_MAX_RETRIES", u64::from(config.max_retries)) as u32;
        config.max_concurrent_downloads =
            env_u64("FULLTEXT_MAX_CONCURRENT_DOWNLOADS", config.max_concurrent_downloads as u64) as usize;
        config.batch_max_concurrent =
            env_u64("FULLTEXT_BATCH_MAX_CONCURRENT", config.batch_max_concurrent as u64) as usize;

        config.min_pdf_size_bytes = env_u64("FULLTEXT_MIN_PDF_SIZE_BYTES", config.min_pdf_size_bytes as u64) as usize;
        config.max_pdf_size_bytes = env_u64("FULLTEXT_MAX_PDF_SIZE_BYTES", config.max_pdf_size_bytes as u64) as usize;

        if let Ok(dir) = std::env::var("FULLTEXT_CACHE_ROOT_DIR") {
            config.cache_root_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("FULLTEXT_PDF_STORAGE_ROOT_DIR") {
            config.pdf_storage_root_dir = PathBuf::from(dir);
        }

        if let Ok(mirrors) = std::env::var("FULLTEXT_SCIHUB_MIRRORS") {
            config.scihub_mirrors = split_mirrors(&mirrors);
        }
        if let Ok(mirrors) = std::env::var("FULLTEXT_LIBGEN_MIRRORS") {
            config.libgen_mirrors = split_mirrors(&mirrors);
        }

        config.accept_invalid_certs = env_bool("FULLTEXT_ACCEPT_INVALID_CERTS", config.accept_invalid_certs);

        config
    }

    /// Enforces cross-field invariants: credential-requires-toggle, size
    /// bound ordering, and positivity of concurrency/timeout knobs.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_unpaywall && self.unpaywall_email.is_none() {
            return Err(ConfigError::MissingUnpaywallEmail);
        }
        if self.enable_institutional && self.institutional_proxy_suffix.is_none() {
            return Err(ConfigError::MissingInstitutionalProxySuffix);
        }
        if self.min_pdf_size_bytes >= self.max_pdf_size_bytes {
            return Err(ConfigError::InvalidPdfSizeBounds {
                min: self.min_pdf_size_bytes,
                max: self.max_pdf_size_bytes,
            });
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::MustBePositive {
                field: "max_concurrent_downloads",
                value: 0,
            });
        }
        if self.batch_max_concurrent == 0 {
            return Err(ConfigError::MustBePositive {
                field: "batch_max_concurrent",
                value: 0,
            });
        }
        if self.timeout_per_source_seconds == 0 {
            return Err(ConfigError::MustBePositive {
                field: "timeout_per_source_seconds",
                value: 0,
            });
        }
        Ok(())
    }

    /// PMC rate, in requests per second: 10 with an NCBI API key, 3 without.
    #[must_use]
    pub fn pmc_requests_per_second(&self) -> f64 {
        if self.ncbi_api_key.is_some() {
            NCBI_API_KEY_RATE
        } else {
            DEFAULT_NCBI_RATE
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn split_mirrors(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Installs a `tracing-subscriber` `EnvFilter`-based subscriber once, at
/// process start. Honors `RUST_LOG` when set, otherwise derives a level from
/// `verbosity` (CLI `-v` count: 0 = info, 1 = debug, 2+ = trace).
///
/// Library code never calls this; only the binary does.
pub fn install_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
