use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::model::UiSettingsV1;
use super::{SettingsStoreError, SETTINGS_FILE_NAME};

/// Settings live next to where the interface was started.
pub fn settings_file_path() -> Result<PathBuf, SettingsStoreError> {
    let cwd = std::env::current_dir().map_err(SettingsStoreError::io("read", "."))?;
    Ok(cwd.join(SETTINGS_FILE_NAME))
}

/// Read the settings file. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<UiSettingsV1, SettingsStoreError> {
    match fs::read_to_string(path) {
        Ok(text) => UiSettingsV1::from_json(&text),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(UiSettingsV1::default()),
        Err(error) => Err(SettingsStoreError::io("read", path)(error)),
    }
}

/// Write to a sibling temp file, then rename it over `path`.
pub fn save_settings(path: &Path, settings: &UiSettingsV1) -> Result<(), SettingsStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(SettingsStoreError::io("create", parent))?;
    }
    let text = serde_json::to_string_pretty(settings)?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    let temp = path.with_extension(format!("json.tmp.{nanos}"));
    let written = File::create(&temp).and_then(|mut file| {
        file.write_all(text.as_bytes())?;
        file.sync_all()
    });
    if let Err(error) = written {
        let _ = fs::remove_file(&temp);
        return Err(SettingsStoreError::io("write", temp)(error));
    }

    // Renaming onto an existing file fails on some platforms; remove it and retry once.
    let moved = fs::rename(&temp, path).or_else(|error| {
        if path.exists() {
            fs::remove_file(path).and_then(|()| fs::rename(&temp, path))
        } else {
            Err(error)
        }
    });
    if let Err(error) = moved {
        let _ = fs::remove_file(&temp);
        return Err(SettingsStoreError::io("replace", path)(error));
    }
    Ok(())
}
