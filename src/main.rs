//! Hanviet - Hán-Việt lookup service
//!
//! Entry point for the `hanviet` binary: pinyin romanization plus
//! Chinese-to-Vietnamese translation through a provider fallback chain,
//! served over a web form or driven from the command line.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use hanviet::cli::{Args, CacheAction, Commands};
use hanviet::config::Config;
use hanviet::lookup::{LookupOptions, LookupService};
use hanviet::web;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let service = Arc::new(LookupService::new(&config)?);

    match args.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            web::serve(service, &host, port).await?;
        }
        Commands::Lookup { text, no_tones, analysis, no_cache } => {
            let options = LookupOptions {
                tone_marks: !no_tones,
                detailed_analysis: analysis,
                bypass_cache: no_cache,
            };

            let result = service.lookup(&text, &options).await?;

            println!("{}", result.source_text);
            println!("  pinyin:      {}", result.romanization);
            if result.translation.is_empty() {
                println!("  translation: (unavailable)");
            } else {
                println!("  translation: {}", result.translation);
            }
            println!("  source:      {}", result.source);

            if let Some(analysis) = result.analysis {
                println!(
                    "  analysis:    {} -> {} / {} (tone {})",
                    analysis.character,
                    analysis.pinyin_toned,
                    analysis.pinyin_plain,
                    analysis.tone_number
                );
            }

            if let Some(error) = result.error {
                eprintln!("  warning:     {}", error);
            }
        }
        Commands::Batch { input, no_tones } => {
            let lines = read_batch_lines(input.as_deref())?;
            if lines.is_empty() {
                anyhow::bail!("no input lines to look up");
            }

            let options = LookupOptions {
                tone_marks: !no_tones,
                detailed_analysis: false,
                bypass_cache: false,
            };

            let results = service.lookup_batch(&lines, &options).await;

            println!("{:<20} {:<25} {:<35} {:<15}", "Text", "Pinyin", "Translation", "Source");
            println!("{}", "-".repeat(95));
            for result in &results {
                let status = result
                    .error
                    .clone()
                    .unwrap_or_else(|| result.source.to_string());
                println!(
                    "{:<20} {:<25} {:<35} {:<15}",
                    result.source_text, result.romanization, result.translation, status
                );
            }

            let succeeded = results.iter().filter(|r| r.error.is_none()).count();
            println!("\n{}/{} succeeded", succeeded, results.len());
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                let stats = service.cache_stats();
                println!("\nTranslation Cache:");
                println!("Entries:   {}", stats.entries);
                println!("File size: {:.2} KB", stats.file_size_bytes as f64 / 1024.0);
                println!("On disk:   {}", if stats.file_exists { "yes" } else { "no" });
            }
            CacheAction::Clear => {
                let removed = service.clear_cache()?;
                println!("Cleared {} cached translations", removed);
            }
        },
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".hanviet").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive the process
    let file_appender = rolling::daily(&log_dir, "hanviet.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn read_batch_lines(input: Option<&std::path::Path>) -> Result<Vec<String>> {
    let raw: Vec<String> = match input {
        Some(path) => std::fs::read_to_string(path)?
            .lines()
            .map(str::to_string)
            .collect(),
        None => std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()?,
    };

    Ok(raw
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}
