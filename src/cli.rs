//! CLI argument and subcommand definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve bibliographic identifiers to open-access full-text PDFs.
///
/// A thin wrapper around `fulltext_core`: this binary contains no resolution
/// or download logic of its own, only argument parsing, `Config` assembly,
/// and dispatch into the library.
#[derive(Parser, Debug)]
#[command(name = "fulltext-acquirer")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve one identifier (DOI, PMID, PMCID, or arXiv ID) and print a
    /// JSON summary of the outcome.
    Fetch {
        /// The identifier to resolve.
        identifier: String,

        /// Comma-separated source kinds to exclude (e.g. `scihub,libgen`).
        #[arg(long, value_delimiter = ',')]
        skip_sources: Vec<String>,

        /// If set, also downloads the resolved URL into this directory.
        #[arg(long)]
        download_to: Option<PathBuf>,
    },

    /// Resolve every identifier in `file` (one per line) and print a JSON
    /// array of outcomes, with a progress bar on stderr.
    Batch {
        /// Path to a file of identifiers, one per line.
        file: PathBuf,

        /// Maximum concurrent lookups (overrides `FULLTEXT_BATCH_MAX_CONCURRENT`).
        #[arg(long)]
        max_concurrent: Option<usize>,
    },

    /// Operate on a GEO dataset's PDF manifest.
    Manifest {
        #[command(subcommand)]
        action: ManifestAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ManifestAction {
    /// Re-hash every file recorded for `geo_id` and report mismatches.
    Verify {
        geo_id: String,
    },
    /// Regenerate `geo_id`'s manifest from the files actually on disk.
    Rebuild {
        geo_id: String,
    },
}
