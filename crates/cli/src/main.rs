//! precache CLI entrypoint.

use anyhow::Result;
use clap::Parser;
use precache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod commands;
mod handlers;

use commands::Commands;
use handlers::PurgeOptions;

#[derive(Parser)]
#[command(name = "precache")]
#[command(author, version, about = "Build and serve precache manifests for static sites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Build { dir, out, sw, url_prefix, algorithm } => {
            handlers::build(&config, &dir, &out, sw.as_deref(), url_prefix, algorithm).await?;
        }
        Commands::Install { manifest, origin } => {
            handlers::install(&config, CacheDb::open(&config.db_path).await?, &manifest, origin).await?;
        }
        Commands::Activate { manifest, origin } => {
            handlers::activate(&config, CacheDb::open(&config.db_path).await?, &manifest, origin).await?;
        }
        Commands::Fetch { url, origin } => {
            handlers::fetch(&config, CacheDb::open(&config.db_path).await?, &url, origin).await?;
        }
        Commands::Purge { cache, older_than_days, url_pattern, max_entries, all } => {
            let db = CacheDb::open(&config.db_path).await?;
            let opts = PurgeOptions { cache, older_than_days, url_pattern, max_entries, all };
            handlers::purge(&config, &db, opts).await?;
        }
        Commands::Stats => handlers::stats(&CacheDb::open(&config.db_path).await?).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use precache_core::RevisionAlgorithm;
    use std::path::PathBuf;

    #[test]
    fn test_parse_build_defaults() {
        let cli = Cli::try_parse_from(["precache", "build", "public"]).unwrap();
        match cli.command {
            Commands::Build { dir, out, sw, algorithm, .. } => {
                assert_eq!(dir, PathBuf::from("public"));
                assert_eq!(out, PathBuf::from("precache-manifest.json"));
                assert!(sw.is_none());
                assert!(algorithm.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_build_algorithm() {
        let cli = Cli::try_parse_from(["precache", "build", "public", "--algorithm", "sha256", "--sw", "sw.js"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Build { algorithm: Some(RevisionAlgorithm::Sha256), sw: Some(_), .. }
        ));
        assert!(Cli::try_parse_from(["precache", "build", "public", "--algorithm", "crc32"]).is_err());
    }

    #[test]
    fn test_parse_purge() {
        let cli = Cli::try_parse_from(["precache", "purge", "--max-entries", "50"]).unwrap();
        assert!(matches!(cli.command, Commands::Purge { max_entries: Some(50), all: false, .. }));
    }
}
