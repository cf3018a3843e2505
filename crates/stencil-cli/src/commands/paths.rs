use std::path::Path;

use anyhow::Result;

use crate::output;

/// List every configured template directory with its namespace.
pub async fn run(config_path: &Path) -> Result<()> {
    let renderer = super::load_renderer(config_path).await?;

    output::print_header("stencil paths");
    let paths = renderer.get_paths();
    if paths.is_empty() {
        output::print_warning("no template paths configured");
        return Ok(());
    }
    for entry in paths {
        output::print_path(entry.namespace.as_deref(), &entry.path);
    }
    Ok(())
}
