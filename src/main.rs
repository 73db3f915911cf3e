mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, SourceArgs};
use consent_options::prelude::*;

fn main() -> Result<()> {
    // stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    info!(search_dir = %config.search_dir.display(), "configuration loaded");

    match cli.command {
        Commands::Files { dir } => {
            let dir = dir.unwrap_or_else(|| config.search_dir.clone());
            let files = Loader::new(config.loader.clone())
                .list_data_files(&dir)
                .with_context(|| format!("listing data files in {}", dir.display()))?;
            if files.is_empty() {
                println!("No data files in {}", dir.display());
            }
            for (i, f) in files.iter().enumerate() {
                println!("{:>3}. {}", i + 1, f.display());
            }
        }
        Commands::Options { source, json } => {
            let analyzer = Analyzer::new(with_source_dir(config, &source));
            let records = analyzer.load(None, source.file.as_deref());
            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            let views = analyzer.build_views(&records);
            if json {
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_options(&views);
            }
        }
        Commands::Gatherers { source, json } => {
            let analyzer = Analyzer::new(with_source_dir(config, &source));
            let records = analyzer.load(None, source.file.as_deref());
            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            let tables = analyzer.gatherer_tables(&records);
            if json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                println!(
                    "{} sites, {} cookies, {} consent buttons, {} CMP detections",
                    tables.sites.len(),
                    tables.cookies.len(),
                    tables.buttons.len(),
                    tables.cmps.len()
                );
                for s in &tables.sites {
                    println!(
                        "{}: cookies={} buttons={} secure={} cmps=[{}]",
                        s.site.as_deref().unwrap_or("<unknown>"),
                        s.cookies_found,
                        s.buttons_found,
                        s.has_secure_cookies,
                        s.cmps.join(", ")
                    );
                }
            }
        }
    }
    Ok(())
}

fn with_source_dir(mut config: Config, source: &SourceArgs) -> Config {
    if let Some(dir) = &source.dir {
        config.search_dir = dir.clone();
    }
    config
}

fn print_options(views: &OptionViews) {
    println!("{} sites, {} options", views.wide.len(), views.long.len());
    println!("\nOptions per category:");
    for (category, count) in &views.overall {
        println!("  {:<12} {}", category.as_str(), count);
    }
    println!();
    for row in &views.wide {
        println!("{} ({} options)", row.site.as_deref().unwrap_or("<unknown>"), row.option_count);
        for category in Category::PREVIEWED {
            if let Some(preview) = row.preview(category).filter(|p| !p.is_empty()) {
                println!("  {:<12} {}", category.as_str(), preview);
            }
        }
    }
}
