use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

/// Render `name` and write the output to stdout.
///
/// Parameters come from the `--data` file, then each `--set` in order.
pub async fn run(
    config_path: &Path,
    name: &str,
    data: Option<&Path>,
    set: &[String],
) -> Result<()> {
    let mut params = match data {
        Some(path) => read_params(path)?,
        None => Map::new(),
    };
    for assignment in set {
        let (key, value) = parse_assignment(assignment)?;
        params.insert(key, value);
    }

    let renderer = super::load_renderer(config_path).await?;
    let output = renderer
        .render(name, &Value::Object(params))
        .await
        .with_context(|| format!("failed to render '{name}'"))?;
    print!("{output}");
    Ok(())
}

fn read_params(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read data file {}", path.display()))?;
    match serde_json::from_str(&contents)
        .with_context(|| format!("invalid JSON in {}", path.display()))?
    {
        Value::Object(map) => Ok(map),
        _ => bail!("data file {} must contain a JSON object", path.display()),
    }
}

/// Split `key=value`. The value is read as JSON when it parses, otherwise kept as a string.
fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = assignment.split_once('=') else {
        bail!("expected KEY=VALUE, got '{assignment}'");
    };
    if key.is_empty() {
        bail!("empty parameter name in '{assignment}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
