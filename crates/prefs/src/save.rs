use crate::PrefsError;
use crate::load::read_object;
use mdview_protocol::{FontId, Size};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

fn write_object(path: &Path, map: &Map<String, Value>) -> Result<(), PrefsError> {
    let contents = serde_json::to_string_pretty(map)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Whether a failed read may be answered by writing a fresh object. Missing
/// and corrupt files qualify; a file that exists but cannot be read does not,
/// since its other keys would be lost.
fn starts_fresh(e: &PrefsError) -> bool {
    match e {
        PrefsError::Io(e) => matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidData),
        PrefsError::Json(_) | PrefsError::NotAnObject { .. } => true,
    }
}

/// Read-modify-write of the settings object. A missing parent directory is
/// created and the write retried once.
pub fn update_settings(
    path: &Path,
    patch: impl FnOnce(&mut Map<String, Value>),
) -> Result<(), PrefsError> {
    let mut map = match read_object(path) {
        Ok(map) => map,
        Err(PrefsError::Io(e)) if e.kind() == ErrorKind::NotFound => Map::new(),
        Err(e) if starts_fresh(&e) => {
            log::warn!("rewriting corrupt settings at {}: {e}", path.display());
            Map::new()
        }
        Err(e) => return Err(e),
    };
    patch(&mut map);

    match write_object(path, &map) {
        Err(PrefsError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_object(path, &map)
        }
        other => other,
    }
}

fn save_field(path: &Path, key: &str, value: Value) -> bool {
    match update_settings(path, |map| {
        map.insert(key.to_string(), value);
    }) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{key} not saved to {}: {e}", path.display());
            false
        }
    }
}

pub fn save_font(path: &Path, font: FontId) -> bool {
    save_field(path, "font", Value::from(font.as_str()))
}

pub fn save_size(path: &Path, size: Size) -> bool {
    save_field(path, "size", Value::from(size.px()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_settings;
    use tempfile::tempdir;

    #[test]
    fn test_save_creates_missing_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("mdview").join("settings.json");

        assert!(save_font(&path, FontId::Serif));
        assert!(path.exists());
        assert_eq!(load_settings(&path).font, FontId::Serif);
    }

    #[test]
    fn test_save_merges_with_existing_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "font": "inter", "theme": "dark" }"#).expect("write");

        assert!(save_size(&path, Size::new(22)));

        let file = fs::File::open(&path).expect("open");
        let value: Value = serde_json::from_reader(file).expect("decode");
        assert_eq!(value["font"], "inter");
        assert_eq!(value["size"], 22);
        // Keys this version does not know about survive a write.
        assert_eq!(value["theme"], "dark");
    }

    #[test]
    fn test_save_replaces_corrupt_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").expect("write");

        assert!(save_font(&path, FontId::Readable));
        assert_eq!(load_settings(&path).font, FontId::Readable);
    }

    #[test]
    fn test_only_missing_or_corrupt_files_start_fresh() {
        let io = |kind| PrefsError::Io(std::io::Error::from(kind));
        assert!(starts_fresh(&io(ErrorKind::NotFound)));
        assert!(starts_fresh(&io(ErrorKind::InvalidData)));
        assert!(!starts_fresh(&io(ErrorKind::PermissionDenied)));
        assert!(!starts_fresh(&io(ErrorKind::Interrupted)));

        let json = serde_json::from_str::<Value>("{").expect_err("bad json");
        assert!(starts_fresh(&PrefsError::Json(json)));
    }

    #[test]
    fn test_unreadable_settings_are_left_alone() {
        let dir = tempdir().expect("tempdir");
        // A directory where the file should be cannot be read as text.
        let path = dir.path().join("settings.json");
        fs::create_dir(&path).expect("mkdir");
        fs::write(path.join("keep"), "x").expect("write");

        let err = update_settings(&path, |map| {
            map.insert("font".to_string(), Value::from("mono"));
        })
        .expect_err("unreadable");
        assert!(matches!(err, PrefsError::Io(_)));
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_unwritable_location_reports_false() {
        let dir = tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").expect("write");
        let path = blocker.join("settings.json");

        assert!(!save_font(&path, FontId::Mono));
    }
}
