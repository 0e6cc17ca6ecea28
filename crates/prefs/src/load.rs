use crate::{PrefsError, Settings};
use mdview_protocol::{FontId, Size};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Read the persisted object, keeping unknown keys.
pub(crate) fn read_object(path: &Path) -> Result<Map<String, Value>, PrefsError> {
    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(PrefsError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

fn settings_from_object(map: &Map<String, Value>) -> Settings {
    let font = map
        .get("font")
        .and_then(Value::as_str)
        .map(FontId::from_str_lossy)
        .unwrap_or_default();
    let size = map
        .get("size")
        .and_then(Value::as_u64)
        .and_then(|px| u32::try_from(px).ok())
        .filter(|px| *px > 0)
        .map(Size::new);
    Settings { font, size }
}

pub fn try_load_settings(path: &Path) -> Result<Settings, PrefsError> {
    read_object(path).map(|map| settings_from_object(&map))
}

/// Load settings, falling back to defaults on any problem. Never fails.
pub fn load_settings(path: &Path) -> Settings {
    match try_load_settings(path) {
        Ok(settings) => settings,
        Err(PrefsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no settings at {}, using defaults", path.display());
            Settings::default()
        }
        Err(e) => {
            log::warn!("ignoring settings at {}: {e}", path.display());
            Settings::default()
        }
    }
}
