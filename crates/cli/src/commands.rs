//! CLI command definitions.

use std::path::PathBuf;

use clap::Subcommand;
use precache_core::RevisionAlgorithm;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the precache manifest for a site directory
    Build {
        /// Root of the built site
        dir: PathBuf,

        /// Where to write the manifest JSON
        #[arg(short, long, default_value = "precache-manifest.json")]
        out: PathBuf,

        /// Also render the service worker script to this path
        #[arg(long)]
        sw: Option<PathBuf>,

        /// Prefix prepended to every url
        #[arg(long)]
        url_prefix: Option<String>,

        /// Revision hash algorithm (md5 or sha256)
        #[arg(long, value_parser = parse_algorithm)]
        algorithm: Option<RevisionAlgorithm>,
    },

    /// Fetch manifest entries missing from the precache
    Install {
        /// Path to the manifest JSON
        manifest: PathBuf,

        /// Base URL the manifest urls resolve against
        #[arg(long)]
        origin: Option<String>,
    },

    /// Retire entries dropped from the manifest and refresh stale ones
    Activate {
        /// Path to the manifest JSON
        manifest: PathBuf,

        /// Base URL the manifest urls resolve against
        #[arg(long)]
        origin: Option<String>,
    },

    /// Request a url through the precache and the routes
    Fetch {
        /// Absolute url or origin-relative path
        url: String,

        /// Base URL relative paths resolve against
        #[arg(long)]
        origin: Option<String>,
    },

    /// Purge cache entries
    Purge {
        /// "precache", "runtime" or a full cache name
        #[arg(long, default_value = "runtime")]
        cache: String,

        /// Entries stored more than this many days ago
        #[arg(long)]
        older_than_days: Option<i64>,

        /// Entries whose url contains this substring
        #[arg(long)]
        url_pattern: Option<String>,

        /// Keep only the newest N entries
        #[arg(long)]
        max_entries: Option<usize>,

        /// Delete every entry of the cache
        #[arg(long)]
        all: bool,
    },

    /// Show entry counts and sizes per cache
    Stats,
}

fn parse_algorithm(value: &str) -> Result<RevisionAlgorithm, String> {
    value.parse().map_err(|e: precache_core::Error| e.to_string())
}
