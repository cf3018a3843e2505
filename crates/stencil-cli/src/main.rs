//! stencil CLI: render Handlebars templates through the compile cache.
//!
//! `render`, `paths` and `warm` all assemble a renderer from the same
//! configuration file, so they share one cache.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stencil",
    about = "Render namespaced Handlebars templates with a compile cache",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to stencil.config.json (default: ./stencil.config.json)
    #[arg(long, global = true, env = "STENCIL_CONFIG", default_value = "stencil.config.json")]
    config: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template and print the result
    Render {
        /// Template name, optionally namespaced (`ns::name`)
        name: String,

        /// JSON file with the render parameters (must hold an object)
        #[arg(long, short)]
        data: Option<PathBuf>,

        /// Set a parameter; the value is parsed as JSON, falling back to a string
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// List configured template directories
    Paths,

    /// Precompile every template into the cache
    Warm,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Render { name, data, set } => {
            commands::render::run(&cli.config, &name, data.as_deref(), &set).await?;
        }
        Commands::Paths => {
            commands::paths::run(&cli.config).await?;
        }
        Commands::Warm => {
            commands::warm::run(&cli.config).await?;
        }
    }

    Ok(())
}
