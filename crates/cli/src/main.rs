mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// apimport: import an Aperture library into a photo library
#[derive(Parser)]
#[command(name = "apimport", version, about)]
struct Cli {
    /// Destination library directory
    #[arg(long, global = true, env = "APIMPORT_LIBRARY", default_value_t = default_library_path())]
    library: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import projects, albums and keywords from an .aplibrary bundle
    Import {
        /// Path to the Aperture library bundle
        bundle: PathBuf,
        /// Register masters at their location in the bundle instead of copying them
        #[arg(long)]
        in_place: bool,
        /// Longest folder or keyword chain before it is treated as a cycle
        #[arg(long, default_value_t = 64)]
        max_depth: usize,
    },
    /// Show what an Aperture library contains without importing it
    Inspect {
        /// Path to the Aperture library bundle
        bundle: PathBuf,
        /// Print the full catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show destination library status
    Status,
}

fn default_library_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".apimport")
        .join("library")
        .to_string_lossy()
        .to_string()
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aperture_import=info,aperture_import_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let library = PathBuf::from(&cli.library);

    match cli.command {
        Commands::Import {
            bundle,
            in_place,
            max_depth,
        } => commands::import::run(&library, &bundle, in_place, max_depth)?,
        Commands::Inspect { bundle, json } => commands::inspect::run(&bundle, json)?,
        Commands::Status => commands::status::run(&library)?,
    }

    Ok(())
}
