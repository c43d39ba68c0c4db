//! Persisted interface settings: run settings, plot scaling and the last
//! parameter values entered per instrument.

mod model;
mod store;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use thiserror::Error;

pub(crate) const SETTINGS_FILE_NAME: &str = "instr_ui_settings.json";
pub(super) const SETTINGS_FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SettingsStoreError {
    #[error("cannot {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    InvalidFormat(#[from] serde_json::Error),
    #[error(
        "settings version {found} is not supported (expected {expected})",
        expected = SETTINGS_FILE_VERSION
    )]
    UnsupportedVersion { found: u32 },
}

impl SettingsStoreError {
    fn io(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| SettingsStoreError::Io {
            action,
            path,
            source,
        }
    }
}

pub use model::UiSettingsV1;
pub use store::{load_settings, save_settings, settings_file_path};
