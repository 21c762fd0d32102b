//! Settings stores
//!
//! The file store keeps `{"<user>": {"<key>": "<value>"}}` JSON and rereads
//! it on every lookup so edits apply on the next slider move.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::RwLock;

use tracing::warn;

use crate::provider::{SettingsStore, UserId};

type UserSettings = HashMap<String, HashMap<String, String>>;

/// Errors loading the settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Read(#[from] io::Error),

    #[error("malformed settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load every user's settings; a missing file is empty
    pub fn load(&self) -> Result<UserSettings, SettingsError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str, user: UserId) -> Option<String> {
        let settings = match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = ?self.path, %e, "ignoring unreadable settings");
                return None;
            }
        };

        settings.get(&user.to_string())?.get(key).cloned()
    }
}

/// Settings held in memory
#[cfg(test)]
#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<(UserId, String), String>>,
}

#[cfg(test)]
impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: &str, user: UserId, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert((user, key.to_string()), value.to_string());
        }
    }
}

#[cfg(test)]
impl SettingsStore for MemorySettings {
    fn get(&self, key: &str, user: UserId) -> Option<String> {
        let values = self.values.read().ok()?;
        values.get(&(user, key.to_string())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_lookup_per_user() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"0": {"alert_slider_top": "dnd"}, "10": {"alert_slider_top": "normal"}}"#,
        )
        .unwrap();

        let store = JsonFileSettings::new(&path);
        assert_eq!(store.get("alert_slider_top", 0).as_deref(), Some("dnd"));
        assert_eq!(store.get("alert_slider_top", 10).as_deref(), Some("normal"));
        assert_eq!(store.get("alert_slider_middle", 0), None);
        assert_eq!(store.get("alert_slider_top", 5), None);
    }

    #[test]
    fn test_file_edits_seen_on_next_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettings::new(&path);

        assert_eq!(store.get("mute_media_with_silent", 0), None);
        std::fs::write(&path, r#"{"0": {"mute_media_with_silent": "true"}}"#).unwrap();
        assert!(store.get_bool("mute_media_with_silent", 0, false));
    }

    #[test]
    fn test_malformed_file_reads_as_unset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileSettings::new(&path);
        assert!(matches!(store.load(), Err(SettingsError::Parse(_))));
        assert_eq!(store.get("alert_slider_top", 0), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySettings::new();
        store.set("mute_media_with_silent", 0, "1");
        assert!(store.get_bool("mute_media_with_silent", 0, false));
        assert!(!store.get_bool("mute_media_with_silent", 1, false));
    }
}
