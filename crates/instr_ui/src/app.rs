use std::collections::HashMap;
use std::path::PathBuf;

use eframe::egui;
use log::{info, warn};

use instr_core::events::Axis;
use instr_core::run::RunError;

use crate::interface::SimInterface;
use crate::settings::{load_settings, save_settings, UiSettingsV1};

pub struct InstrUiApp {
    pub interface: SimInterface,
    settings: UiSettingsV1,
    settings_path: Option<PathBuf>,
    pub status: Option<String>,
    /// Colour-map textures keyed by plot, with the hash of the values they show.
    pub(crate) textures: HashMap<String, (u64, egui::TextureHandle)>,
    pub new_view_axis1: Axis,
    pub new_view_axis2: Option<Axis>,
}

impl InstrUiApp {
    /// Build the app, restoring saved settings when `settings_path` is given.
    pub fn new(mut interface: SimInterface, settings_path: Option<PathBuf>) -> Self {
        let mut status = None;
        let settings = match settings_path.as_deref().map(load_settings) {
            Some(Ok(settings)) => {
                settings.restore(&mut interface);
                settings
            }
            Some(Err(err)) => {
                warn!("Settings not loaded: {err}");
                status = Some(format!("Settings not loaded: {err}"));
                UiSettingsV1::default()
            }
            None => UiSettingsV1::default(),
        };
        Self {
            interface,
            settings,
            settings_path,
            status,
            textures: HashMap::new(),
            new_view_axis1: Axis::L,
            new_view_axis2: None,
        }
    }

    pub fn set_instrument_path(&mut self, path: Option<PathBuf>) {
        self.settings.instrument = path;
    }

    pub fn settings(&self) -> &UiSettingsV1 {
        &self.settings
    }

    pub fn record_run(&mut self, result: Result<(), RunError>) {
        self.status = Some(match result {
            Ok(()) => format!("Run {} finished", self.interface.runs_completed()),
            Err(err) => format!("Run failed: {err}"),
        });
    }

    /// Save the settings file when the interface state differs from what was last saved.
    pub fn persist_settings(&mut self) {
        let mut next = self.settings.clone();
        next.capture(&mut self.interface);
        if next == self.settings {
            return;
        }
        self.settings = next;
        let Some(path) = self.settings_path.as_deref() else {
            return;
        };
        match save_settings(path, &self.settings) {
            Ok(()) => info!("Saved settings to {}", path.display()),
            Err(err) => {
                warn!("Settings not saved: {err}");
                self.status = Some(format!("Settings not saved: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use instr_core::synthetic::{demo_instrument, SyntheticRunner};

    use super::*;
    use crate::settings::SETTINGS_FILE_NAME;

    fn interface() -> SimInterface {
        SimInterface::new(demo_instrument(), Box::new(SyntheticRunner))
    }

    #[test]
    fn changed_state_is_written_and_restored() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);

        let mut app = InstrUiApp::new(interface(), Some(path.clone()));
        app.interface.update_ncount("3e4");
        app.interface.update_parameter("distance", "12");
        app.persist_settings();
        assert!(path.exists());

        let restored = InstrUiApp::new(interface(), Some(path));
        assert_eq!(restored.interface.ncount(), 30_000);
        let distance = restored
            .interface
            .textboxes()
            .iter()
            .find(|textbox| textbox.name == "distance")
            .map(|textbox| textbox.text.clone());
        assert_eq!(distance.as_deref(), Some("12"));
        assert!(restored.status.is_none());
    }

    #[test]
    fn unchanged_state_is_not_written() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let mut app = InstrUiApp::new(interface(), Some(path.clone()));
        app.persist_settings();
        assert!(path.exists());
        std::fs::remove_file(&path).expect("remove");
        app.persist_settings();
        assert!(!path.exists());
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "[1, 2").expect("fixture");
        let app = InstrUiApp::new(interface(), Some(path));
        assert_eq!(app.interface.ncount(), 1_000_000);
        assert!(app
            .status
            .as_deref()
            .unwrap_or_default()
            .contains("Settings not loaded"));
    }

    #[test]
    fn run_outcome_is_reported() {
        let mut app = InstrUiApp::new(interface(), None);
        app.record_run(Err(RunError::MissingSource("synthetic_source".to_string())));
        assert!(app
            .status
            .as_deref()
            .unwrap_or_default()
            .starts_with("Run failed"));
    }
}
