//! PDF fetching: HTTP download, structural validation, landing-page
//! recovery, and retry with exponential backoff.
//!
//! [`downloader::PDFDownloader`] is the entry point; everything else in this
//! module exists to support it.

mod downloader;
mod error;
mod filename;
mod landing_page;
mod retry;

pub use downloader::PDFDownloader;
pub use error::{DownloadError, DownloadOutcome};
pub use filename::derive_filename;
pub use landing_page::extract_pdf_url;
pub use retry::{classify_error, FailureType, RetryDecision, RetryPolicy, DEFAULT_MAX_RETRIES};
