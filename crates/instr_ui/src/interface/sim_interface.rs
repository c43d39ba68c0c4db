use log::{error, info, warn};

use instr_core::instrument::{Instrument, ParameterMap, ParameterValue};
use instr_core::run::{
    parse_ncount, InstrumentRunner, MpiSetting, RunError, RunRequest, DEFAULT_FOLDER_NAME,
    DEFAULT_MPI_TEXT, DEFAULT_NCOUNT, DEFAULT_NCOUNT_TEXT,
};

use super::{InterfaceUpdate, ParameterTextbox, UpdateOutcome};
use crate::plot_interface::PlotInterface;

/// Parameter entry, run settings and the run trigger for one instrument.
pub struct SimInterface {
    instrument: Instrument,
    runner: Box<dyn InstrumentRunner>,
    parameters: ParameterMap,
    textboxes: Vec<ParameterTextbox>,
    ncount: u64,
    pub ncount_text: String,
    ncount_feedback: Option<String>,
    mpi: MpiSetting,
    pub mpi_text: String,
    mpi_feedback: Option<String>,
    foldername: String,
    busy: bool,
    /// Frames left before a requested run starts.
    pending_frames: Option<u8>,
    last_error: Option<String>,
    runs_completed: usize,
    plot_interface: Option<PlotInterface>,
}

impl SimInterface {
    pub fn new(instrument: Instrument, runner: Box<dyn InstrumentRunner>) -> Self {
        let parameters = instrument.default_parameters();
        let textboxes = instrument
            .parameter_list
            .iter()
            .map(ParameterTextbox::new)
            .collect();
        Self {
            instrument,
            runner,
            parameters,
            textboxes,
            ncount: DEFAULT_NCOUNT,
            ncount_text: DEFAULT_NCOUNT_TEXT.to_string(),
            ncount_feedback: None,
            mpi: MpiSetting::Disabled,
            mpi_text: DEFAULT_MPI_TEXT.to_string(),
            mpi_feedback: None,
            foldername: DEFAULT_FOLDER_NAME.to_string(),
            busy: false,
            pending_frames: None,
            last_error: None,
            runs_completed: 0,
            plot_interface: None,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn parameters(&self) -> &ParameterMap {
        &self.parameters
    }

    pub fn textboxes(&self) -> &[ParameterTextbox] {
        &self.textboxes
    }

    pub fn textboxes_mut(&mut self) -> &mut [ParameterTextbox] {
        &mut self.textboxes
    }

    pub fn ncount(&self) -> u64 {
        self.ncount
    }

    pub fn mpi(&self) -> MpiSetting {
        self.mpi
    }

    pub fn ncount_feedback(&self) -> Option<&str> {
        self.ncount_feedback.as_deref()
    }

    pub fn mpi_feedback(&self) -> Option<&str> {
        self.mpi_feedback.as_deref()
    }

    pub fn foldername(&self) -> &str {
        &self.foldername
    }

    pub fn set_foldername(&mut self, foldername: impl Into<String>) {
        self.foldername = foldername.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy || self.pending_frames.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn runs_completed(&self) -> usize {
        self.runs_completed
    }

    /// Apply one named update. This is the only place interface state changes.
    pub fn apply(&mut self, update: InterfaceUpdate) -> UpdateOutcome {
        match update {
            InterfaceUpdate::Parameter { name, value } => {
                if let Some(textbox) = self.textboxes.iter_mut().find(|t| t.name == name) {
                    textbox.text = value.clone();
                }
                self.parameters.insert(name, ParameterValue::Text(value));
                UpdateOutcome::Applied
            }
            InterfaceUpdate::Ncount(text) => {
                let outcome = match parse_ncount(&text) {
                    Ok(ncount) => {
                        self.ncount = ncount;
                        UpdateOutcome::Applied
                    }
                    Err(reason) => {
                        warn!("Keeping ncount {}: {reason}", self.ncount);
                        UpdateOutcome::Rejected(reason.to_string())
                    }
                };
                self.ncount_text = text;
                self.ncount_feedback = rejection(&outcome);
                outcome
            }
            InterfaceUpdate::Mpi(text) => {
                let outcome = match text.parse::<MpiSetting>() {
                    Ok(mpi) => {
                        self.mpi = mpi;
                        UpdateOutcome::Applied
                    }
                    Err(reason) => {
                        warn!("Keeping mpi {}: {reason}", self.mpi);
                        UpdateOutcome::Rejected(reason.to_string())
                    }
                };
                self.mpi_text = text;
                self.mpi_feedback = rejection(&outcome);
                outcome
            }
        }
    }

    pub fn update_parameter(&mut self, name: &str, value: &str) -> UpdateOutcome {
        self.apply(InterfaceUpdate::Parameter {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn update_ncount(&mut self, text: &str) -> UpdateOutcome {
        self.apply(InterfaceUpdate::Ncount(text.to_string()))
    }

    pub fn update_mpi(&mut self, text: &str) -> UpdateOutcome {
        self.apply(InterfaceUpdate::Mpi(text.to_string()))
    }

    /// Back to the instrument defaults, for both the mapping and the text fields.
    pub fn reset_parameters(&mut self) {
        self.parameters = self.instrument.default_parameters();
        self.textboxes = self
            .instrument
            .parameter_list
            .iter()
            .map(ParameterTextbox::new)
            .collect();
    }

    /// Request built from the current parameters and run settings.
    pub fn run_request(&self) -> RunRequest {
        RunRequest::new(self.parameters.clone(), self.ncount)
            .with_foldername(self.foldername.clone())
            .with_mpi(self.mpi)
    }

    /// Run the instrument now and hand the result to the plot interface.
    ///
    /// The busy flag is cleared again whether or not the run succeeds.
    pub fn run_simulation(&mut self) -> Result<(), RunError> {
        let request = self.run_request();
        self.busy = true;
        info!("Running {} with {request}", self.instrument.name);
        let result = self.runner.run_full_instrument(&self.instrument, &request);
        self.busy = false;

        let data = result?;
        self.runs_completed += 1;
        info!(
            "Run finished with {} monitors: {}",
            data.monitors.len(),
            data.names().collect::<Vec<_>>().join(", ")
        );
        self.plot_interface().set_data(data);
        Ok(())
    }

    /// Ask for a run. It starts one frame later so the busy indicator is painted first.
    pub fn request_run(&mut self) {
        if !self.is_busy() {
            self.pending_frames = Some(1);
        }
    }

    /// Called once per frame. Runs a requested simulation once its frame comes up,
    /// and returns `None` on every other call.
    pub fn run_if_requested(&mut self) -> Option<Result<(), RunError>> {
        match self.pending_frames {
            None => return None,
            Some(0) => self.pending_frames = None,
            Some(frames) => {
                self.pending_frames = Some(frames - 1);
                return None;
            }
        }
        let result = self.run_simulation();
        self.last_error = match &result {
            Ok(()) => None,
            Err(err) => {
                error!("Run failed: {err}");
                Some(err.to_string())
            }
        };
        Some(result)
    }

    /// The plot interface, built on first use.
    pub fn plot_interface(&mut self) -> &mut PlotInterface {
        self.plot_interface.get_or_insert_with(PlotInterface::new)
    }

    pub fn has_plot_interface(&self) -> bool {
        self.plot_interface.is_some()
    }
}

fn rejection(outcome: &UpdateOutcome) -> Option<String> {
    match outcome {
        UpdateOutcome::Applied => None,
        UpdateOutcome::Rejected(reason) => Some(reason.clone()),
    }
}
