use std::path::Path;

use anyhow::{bail, Result};

use crate::output;

/// Compile every discoverable template into the cache.
///
/// Fails after printing the summary if any template did not compile.
pub async fn run(config_path: &Path) -> Result<()> {
    output::print_header("stencil warm");

    output::print_step(1, 2, "Assembling renderer...");
    let renderer = super::load_renderer(config_path).await?;

    output::print_step(2, 2, "Compiling templates...");
    let report = renderer.warm().await?;

    output::print_count("compiled", report.compiled.len());
    output::print_count("already cached", report.cached.len());
    output::print_count("failed", report.failed.len());
    for (key, reason) in &report.failed {
        output::print_failure(key, reason);
    }

    if !report.failed.is_empty() {
        bail!("{} template(s) failed to compile", report.failed.len());
    }
    output::print_success("Cache is warm");
    Ok(())
}
