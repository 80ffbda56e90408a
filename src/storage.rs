use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// File-per-key JSON store. Each key's value is the sole document in
/// `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    dir: PathBuf,
}

impl KeyValueStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("unable to create data directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Unreadable or malformed entries degrade to `None`; both cases are
    /// logged, never surfaced.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("failed to read stored value. [key = {key}, error = {err}]");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("malformed stored value. [key = {key}, error = {err}]");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.entry_path(key);
        let text = serde_json::to_string_pretty(value)
            .with_context(|| format!("unable to serialize value for key '{key}'"))?;
        fs::write(&path, format!("{text}\n"))
            .with_context(|| format!("unable to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let store = KeyValueStore::open(dir.path()).expect("open");
        assert_eq!(store.get::<Vec<String>>("alarms"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().expect("tempdir");
        let store = KeyValueStore::open(dir.path()).expect("open");
        let value = vec!["a".to_string(), "b".to_string()];
        store.set("alarms", &value).expect("set");
        assert_eq!(store.get::<Vec<String>>("alarms"), Some(value));
    }

    #[test]
    fn malformed_entry_reads_as_none() {
        let dir = tempdir().expect("tempdir");
        let store = KeyValueStore::open(dir.path()).expect("open");
        fs::write(dir.path().join("alarms.json"), "{ not-valid-json ").expect("write");
        assert_eq!(store.get::<Vec<String>>("alarms"), None);
    }

    #[test]
    fn keys_do_not_collide() {
        let dir = tempdir().expect("tempdir");
        let store = KeyValueStore::open(dir.path()).expect("open");
        store.set("alarms", &vec![1, 2, 3]).expect("set alarms");
        store.set("alarm-theme", &"dark".to_string()).expect("set theme");
        assert_eq!(store.get::<Vec<i32>>("alarms"), Some(vec![1, 2, 3]));
        assert_eq!(store.get::<String>("alarm-theme"), Some("dark".to_string()));
    }
}
