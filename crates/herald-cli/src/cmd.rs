//! External command execution helpers.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio::process::Command;

/// Execute a command with logging. Logs the full command line at debug
/// level and a human-friendly description at info level.
pub async fn run_cmd(
    description: &str,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<()> {
    let cmd_line = format!("{program} {}", args.join(" "));
    tracing::info!("{description}");
    tracing::debug!("exec: {cmd_line}");

    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .with_context(|| format!("failed to execute: {cmd_line}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("command failed: {cmd_line}\nstderr: {stderr}");
        bail!("{description} failed (exit {}): {stderr}", output.status);
    }
    Ok(())
}

/// Check whether a program exists on PATH.
pub fn command_exists(program: &str) -> bool {
    std::process::Command::new("which")
        .arg(program)
        .output()
        .is_ok_and(|o| o.status.success())
}

/// Fail fast when a required external tool is missing, before any stage
/// that would die mid-way with a cryptic spawn error.
pub fn ensure_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        if !command_exists(tool) {
            bail!("`{tool}` not found on PATH -- install it and re-run the setup");
        }
    }
    Ok(())
}
