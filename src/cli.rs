use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web UI and JSON API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Look up a single word or phrase
    Lookup {
        /// Chinese text to look up
        text: String,

        /// Render pinyin without tone marks
        #[arg(long)]
        no_tones: bool,

        /// Show per-character analysis (single-character input only)
        #[arg(long)]
        analysis: bool,

        /// Skip the translation cache and force a provider call
        #[arg(long)]
        no_cache: bool,
    },

    /// Look up many words, one per line, from a file or stdin
    Batch {
        /// Input file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Render pinyin without tone marks
        #[arg(long)]
        no_tones: bool,
    },

    /// Manage the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show entry count and file size
    Stats,
    /// Remove all cached translations
    Clear,
}
