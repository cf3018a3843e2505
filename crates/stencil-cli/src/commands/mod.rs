//! CLI command implementations for stencil.
//!
//! Each module corresponds to a subcommand (`stencil <command>`).

pub mod paths;
pub mod render;
pub mod warm;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use stencil_core::config::RendererConfig;
use stencil_core::engine::HandlebarsEngine;
use stencil_core::factory;
use stencil_core::helpers::HelperCatalog;
use stencil_core::Renderer;

/// Load the configuration and assemble a renderer from it.
///
/// Relative paths in the file are taken relative to the file itself.
pub async fn load_renderer(config_path: &Path) -> Result<Renderer> {
    let mut config = RendererConfig::load(config_path)?;
    let base = match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().context("cannot determine the working directory")?,
    };
    config.rebase(&base);
    debug!("loaded {} (base {})", config_path.display(), base.display());

    let renderer = factory::build_renderer(
        &config,
        Box::new(HandlebarsEngine::new()),
        HelperCatalog::builtin(),
    )
    .await?;
    Ok(renderer)
}
