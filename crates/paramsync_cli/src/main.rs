//! Paramsync CLI
//!
//! Command-line tools for paramsync disk caches.
//!
//! # Commands
//!
//! - `inspect` - Decode a cache file and show its header and content
//! - `verify` - Check that every cache file in a directory decodes
//! - `cache-path` - Print the cache file location for a parameter path

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paramsync command-line cache tools.
#[derive(Parser)]
#[command(name = "paramsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a cache file and show its header and content
    Inspect {
        /// Path to the cache file
        file: PathBuf,

        /// Print the cached content as well
        #[arg(short, long)]
        content: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that every cache file in a directory decodes
    Verify {
        /// Cache directory
        #[arg(short = 'd', long)]
        cache_dir: PathBuf,
    },

    /// Print the cache file location for a parameter path
    CachePath {
        /// Cache directory
        #[arg(short = 'd', long)]
        cache_dir: PathBuf,

        /// Parameter file path on the server (e.g. /app/flags)
        path: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect {
            file,
            content,
            format,
        } => {
            commands::inspect::run(&file, content, &format)?;
        }
        Commands::Verify { cache_dir } => {
            commands::verify::run(&cache_dir)?;
        }
        Commands::CachePath { cache_dir, path } => {
            println!(
                "{}",
                paramsync_engine::cache_file_path(&cache_dir, &path).display()
            );
        }
        Commands::Version => {
            println!("paramsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
