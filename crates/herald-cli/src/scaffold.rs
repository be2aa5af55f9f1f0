//! Starter-project scaffolding: clone, install, environment file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::cmd::run_cmd;

/// Git repository of the Herald starter app.
pub const STARTER_REPO_URL: &str = "https://github.com/heraldhq/herald-starter";

const ENV_FILE: &str = ".env";

/// Clone the starter project into `dir`. Clone failure is fatal.
pub async fn clone_starter(dir: &Path) -> Result<()> {
    let target = dir.display().to_string();
    run_cmd(
        "Cloning starter project",
        "git",
        &["clone", "--depth", "1", STARTER_REPO_URL, &target],
        None,
    )
    .await
}

/// Install the starter project's dependencies. Install failure is fatal.
pub async fn install_dependencies(dir: &Path) -> Result<()> {
    run_cmd("Installing dependencies (npm install)", "npm", &["install"], Some(dir)).await
}

/// Ensure `dir/.env` exists with the app identifier, secret key, and a
/// subscriber identifier. Returns the subscriber id: the one already in
/// the file when present, a fresh UUID v4 otherwise.
pub fn ensure_env_file(dir: &Path, app_identifier: &str, secret_key: &str) -> Result<String> {
    let path = dir.join(ENV_FILE);
    if path.exists() {
        if let Some(existing) = read_env_value(&path, "HERALD_SUBSCRIBER_ID")? {
            tracing::debug!(path = %path.display(), "keeping existing env file");
            return Ok(existing);
        }
    }

    let subscriber_id = Uuid::new_v4().to_string();
    let contents = format!(
        "HERALD_APP_IDENTIFIER={app_identifier}\n\
         HERALD_SECRET_KEY={secret_key}\n\
         HERALD_SUBSCRIBER_ID={subscriber_id}\n"
    );
    std::fs::write(&path, contents)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote environment file");
    Ok(subscriber_id)
}

/// Read one `KEY=value` entry from a flat env file.
fn read_env_value(path: &Path, key: &str) -> Result<Option<String>> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(contents.lines().find_map(|line| {
        line.strip_prefix(key)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.trim().to_string())
    }))
}

/// Default directory the starter project is scaffolded into.
pub fn default_project_dir() -> PathBuf {
    PathBuf::from("herald-starter")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_all_three_keys() {
        let dir = tempfile::tempdir().unwrap();
        let subscriber_id = ensure_env_file(dir.path(), "app-123", "sk_test").unwrap();

        let contents = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert!(contents.contains("HERALD_APP_IDENTIFIER=app-123"));
        assert!(contents.contains("HERALD_SECRET_KEY=sk_test"));
        assert!(contents.contains(&format!("HERALD_SUBSCRIBER_ID={subscriber_id}")));
        // Subscriber id is a valid UUID.
        Uuid::parse_str(&subscriber_id).unwrap();
    }

    #[test]
    fn keeps_existing_subscriber_id() {
        let dir = tempfile::tempdir().unwrap();
        let first = ensure_env_file(dir.path(), "app-123", "sk_test").unwrap();
        let second = ensure_env_file(dir.path(), "app-123", "sk_test").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rewrites_env_file_missing_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "HERALD_APP_IDENTIFIER=old\n").unwrap();
        let subscriber_id = ensure_env_file(dir.path(), "app-123", "sk_test").unwrap();
        let contents = std::fs::read_to_string(dir.path().join(".env")).unwrap();
        assert!(contents.contains("HERALD_APP_IDENTIFIER=app-123"));
        assert!(contents.contains(&subscriber_id));
    }
}
