use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Inspect consent-banner options in crawl exports
#[derive(Parser)]
#[command(name = "consent-options")]
#[command(about = "Extract and categorize cookie-consent options from crawl records", long_about = None)]
pub struct Cli {
    /// Config file (TOML). Falls back to CONSENT_OPTIONS_CONFIG, then the platform config dir.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List data files, newest first
    Files {
        /// Directory to scan instead of the configured search dir
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Categorize banner options per site
    Options {
        #[command(flatten)]
        source: SourceArgs,
        /// Print every view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize cookies, buttons and CMPs per site
    Gatherers {
        #[command(flatten)]
        source: SourceArgs,
        /// Print every table as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
pub struct SourceArgs {
    /// Export to load (.zip, .json, .ndjson); relative to the search dir
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Search dir override
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}
