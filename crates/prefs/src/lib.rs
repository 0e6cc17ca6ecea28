mod load;
mod save;

use mdview_protocol::{FontId, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use load::{load_settings, try_load_settings};
pub use save::{save_font, save_size, update_settings};

/// Overrides the directory that holds `settings.json`.
pub const CONFIG_DIR_ENV: &str = "MDVIEW_CONFIG_DIR";

const SETTINGS_FILE: &str = "settings.json";

/// Persisted display preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub font: FontId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

impl Settings {
    pub fn size_or_default(&self) -> Size {
        self.size.unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings file '{path}' does not hold a JSON object")]
    NotAnObject { path: PathBuf },
}

/// Handle on the per-user settings file.
///
/// There is no cross-process locking: two running instances sharing one
/// config directory resolve concurrent writes as last-writer-wins.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$MDVIEW_CONFIG_DIR/settings.json`, else `<config dir>/mdview/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir).join(SETTINGS_FILE));
        }
        dirs::config_dir().map(|p| p.join("mdview").join(SETTINGS_FILE))
    }

    /// Store at [`SettingsStore::default_path`], falling back to the working
    /// directory when the platform has no config dir.
    pub fn open_default() -> Self {
        Self::new(Self::default_path().unwrap_or_else(|| PathBuf::from(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Settings {
        load_settings(&self.path)
    }

    pub fn save_font(&self, font: FontId) -> bool {
        save_font(&self.path, font)
    }

    pub fn save_size(&self, size: Size) -> bool {
        save_size(&self.path, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_default_is_system_font() {
        let settings = Settings::default();
        assert_eq!(settings.font, FontId::System);
        assert_eq!(settings.size, None);
        assert_eq!(settings.size_or_default(), Size::new(16));
    }

    #[test]
    fn test_settings_serialization_skips_missing_size() {
        let json = serde_json::to_string(&Settings::default()).expect("serialize");
        assert_eq!(json, r#"{"font":"system"}"#);
    }

    #[test]
    fn test_store_round_trip_across_instances() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        for font in FontId::ALL {
            assert!(SettingsStore::new(&path).save_font(font));
            // A fresh store models a process restart.
            assert_eq!(SettingsStore::new(&path).load().font, font);
        }
    }
}
