//! Interactive prompts for the setup wizard.

use std::path::PathBuf;

use anyhow::Result;
use dialoguer::{Input, Password};

/// Prompt for the Herald API key (hidden input).
pub fn prompt_api_key(non_interactive: bool) -> Result<String> {
    if non_interactive {
        return std::env::var("HERALD_API_KEY").map_err(|_| {
            anyhow::anyhow!("HERALD_API_KEY env var is required in non-interactive mode")
        });
    }
    let key: String = Password::new()
        .with_prompt("Herald API key (Dashboard -> Settings -> API keys)")
        .interact()?;
    Ok(key)
}

/// Prompt for the project directory to scaffold into.
pub fn prompt_project_dir(non_interactive: bool, default: &str) -> Result<PathBuf> {
    if non_interactive {
        return Ok(PathBuf::from(default));
    }
    let dir: String = Input::new()
        .with_prompt("Project directory")
        .default(default.to_string())
        .interact_text()?;
    Ok(PathBuf::from(dir))
}
