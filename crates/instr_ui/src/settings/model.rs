use std::collections::BTreeMap;
use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};

use instr_core::run::{DEFAULT_FOLDER_NAME, DEFAULT_MPI_TEXT, DEFAULT_NCOUNT_TEXT};

use super::{SettingsStoreError, SETTINGS_FILE_VERSION};
use crate::interface::SimInterface;
use crate::plot_interface::DEFAULT_ORDERS_OF_MAGNITUDE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UiSettingsV1 {
    pub version: u32,
    pub instrument: Option<PathBuf>,
    pub ncount: String,
    pub mpi: String,
    pub foldername: String,
    pub log_scale: bool,
    pub orders_of_magnitude: f64,
    /// Instrument name to parameter name to the text last entered.
    #[serde(default)]
    pub parameters: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for UiSettingsV1 {
    fn default() -> Self {
        Self {
            version: SETTINGS_FILE_VERSION,
            instrument: None,
            ncount: DEFAULT_NCOUNT_TEXT.to_string(),
            mpi: DEFAULT_MPI_TEXT.to_string(),
            foldername: DEFAULT_FOLDER_NAME.to_string(),
            log_scale: false,
            orders_of_magnitude: DEFAULT_ORDERS_OF_MAGNITUDE,
            parameters: BTreeMap::new(),
        }
    }
}

impl UiSettingsV1 {
    /// Parse a settings file, refusing versions this build does not write.
    pub fn from_json(text: &str) -> Result<Self, SettingsStoreError> {
        let settings: Self = serde_json::from_str(text)?;
        if settings.version != SETTINGS_FILE_VERSION {
            return Err(SettingsStoreError::UnsupportedVersion {
                found: settings.version,
            });
        }
        Ok(settings)
    }

    /// Record the interface state, keeping parameters saved for other instruments.
    pub fn capture(&mut self, interface: &mut SimInterface) {
        self.ncount = interface.ncount_text.clone();
        self.mpi = interface.mpi_text.clone();
        self.foldername = interface.foldername().to_string();
        let texts = interface
            .textboxes()
            .iter()
            .map(|textbox| (textbox.name.clone(), textbox.text.clone()))
            .collect();
        self.parameters
            .insert(interface.instrument().name.clone(), texts);
        if interface.has_plot_interface() {
            let plots = interface.plot_interface();
            self.log_scale = plots.log_scale;
            self.orders_of_magnitude = plots.orders_of_magnitude;
        }
    }

    /// Push saved values back through the interface's updates.
    ///
    /// Values the interface rejects are logged and leave its defaults in place.
    pub fn restore(&self, interface: &mut SimInterface) {
        if !interface.update_ncount(&self.ncount).is_applied() {
            warn!("Ignoring saved ncount '{}'", self.ncount);
        }
        if !interface.update_mpi(&self.mpi).is_applied() {
            warn!("Ignoring saved mpi '{}'", self.mpi);
        }
        if !self.foldername.trim().is_empty() {
            interface.set_foldername(self.foldername.clone());
        }

        let instrument_name = interface.instrument().name.clone();
        if let Some(saved) = self.parameters.get(&instrument_name) {
            for (name, text) in saved {
                let declared = interface.instrument().parameter(name).is_some();
                if declared && !text.is_empty() {
                    interface.update_parameter(name, text);
                }
            }
        }

        let plots = interface.plot_interface();
        plots.log_scale = self.log_scale;
        plots.orders_of_magnitude = self.orders_of_magnitude;
    }
}
