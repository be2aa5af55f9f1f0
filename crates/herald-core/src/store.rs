//! On-disk session store for issued relay endpoints.
//!
//! The tunnel issuer hands out a fresh public relay URL per request. Re-using
//! the previously issued URL for the same local port keeps the public bridge
//! address stable across runs, so the store persists a `port -> relay URL`
//! map as a small JSON file under the user config dir.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Persisted `local port -> relay URL` map.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    relay_urls: HashMap<u16, String>,
}

/// Session store backed by a JSON file.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    file: StoreFile,
}

impl SessionStore {
    /// Default store location: `<config dir>/herald/session.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("herald")
            .join("session.json")
    }

    /// Load the store from `path`, starting empty if the file is absent.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| Error::Store(format!("corrupt store {}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, file })
    }

    /// Relay URL previously issued for `port`, if any.
    pub fn relay_url(&self, port: u16) -> Option<&str> {
        self.file.relay_urls.get(&port).map(String::as_str)
    }

    /// Record the relay URL issued for `port` and persist the store.
    pub fn set_relay_url(&mut self, port: u16, url: impl Into<String>) -> Result<()> {
        self.file.relay_urls.insert(port, url.into());
        self.save()
    }

    /// Drop the cached relay URL for `port` (e.g. after the relay rejected
    /// a reconnect) and persist the store.
    pub fn forget_relay_url(&mut self, port: u16) -> Result<()> {
        if self.file.relay_urls.remove(&port).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.file)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load(dir.path().join("session.json")).unwrap();
        assert!(store.relay_url(4000).is_none());
    }

    #[test]
    fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald").join("session.json");

        let mut store = SessionStore::load(&path).unwrap();
        store
            .set_relay_url(4000, "https://abc.relay.herald.dev")
            .unwrap();

        let reloaded = SessionStore::load(&path).unwrap();
        assert_eq!(
            reloaded.relay_url(4000),
            Some("https://abc.relay.herald.dev")
        );
        assert!(reloaded.relay_url(4001).is_none());
    }

    #[test]
    fn forget_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::load(&path).unwrap();
        store.set_relay_url(4000, "https://abc.relay.herald.dev").unwrap();
        store.forget_relay_url(4000).unwrap();
        assert!(store.relay_url(4000).is_none());

        let reloaded = SessionStore::load(&path).unwrap();
        assert!(reloaded.relay_url(4000).is_none());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let err = SessionStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
