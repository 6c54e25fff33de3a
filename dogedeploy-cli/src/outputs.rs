//! Structured step outputs.

use anyhow::{Context, Result};
use dogedeploy_cloud::DeployResult;
use std::io::Write;
use std::path::Path;

/// Output name/value pairs published for downstream steps.
pub fn step_outputs(result: &DeployResult) -> Vec<(&'static str, String)> {
    vec![
        ("uploaded-files", result.uploaded_count.to_string()),
        ("deployment-url", result.deployment_url.clone()),
        ("total-size", result.total_bytes.to_string()),
        ("duration", result.duration_ms.to_string()),
        ("failed-files", result.failed_keys.join(",")),
    ]
}

/// Appends `name=value` lines to the runner's output file.
pub fn write_outputs(path: &Path, result: &DeployResult) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open output file {}", path.display()))?;

    for (name, value) in step_outputs(result) {
        writeln!(file, "{name}={value}")
            .with_context(|| format!("failed to write output {name}"))?;
    }
    Ok(())
}
