//! Runs instruments through an external `mcrun`-compatible executable.
//!
//! The executable writes McCode text output into a fresh folder under the
//! output root; that folder is then read back with [`load_folder`].

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::dataset::Dataset;
use crate::instrument::Instrument;
use crate::loader::load_folder;
use crate::run::{check_parameters, InstrumentRunner, RunError, RunRequest};

pub const DEFAULT_EXECUTABLE: &str = "mcrun";

#[derive(Debug, Clone)]
pub struct McrunExecutor {
    pub executable: PathBuf,
    pub output_root: PathBuf,
}

impl Default for McrunExecutor {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            output_root: PathBuf::from("."),
        }
    }
}

impl McrunExecutor {
    pub fn new(executable: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            output_root: output_root.into(),
        }
    }

    /// Folder the next run writes to.
    ///
    /// With increments, the first free name of `name`, `name_0`, `name_1`, ...
    /// Without, `name` itself, which must not exist yet.
    pub fn resolve_output_folder(&self, request: &RunRequest) -> Result<PathBuf, RunError> {
        let base = self.output_root.join(&request.foldername);
        if !base.exists() {
            return Ok(base);
        }
        if !request.increment_folder_name {
            return Err(RunError::FolderExists(base));
        }
        let mut index = 0_usize;
        loop {
            let candidate = self
                .output_root
                .join(format!("{}_{index}", request.foldername));
            if !candidate.exists() {
                return Ok(candidate);
            }
            index += 1;
        }
    }
}

/// Arguments passed to the executable, in order.
pub fn build_arguments(source: &Path, folder: &Path, request: &RunRequest) -> Vec<String> {
    let mut args = vec!["-c".to_string(), "-n".to_string(), request.ncount.to_string()];
    if let Some(mpi) = request.mpi {
        args.push(format!("--mpi={mpi}"));
    }
    args.push("-d".to_string());
    args.push(folder.display().to_string());
    args.push(source.display().to_string());
    args.extend(
        request
            .parameters
            .iter()
            .map(|(name, value)| format!("{name}={value}")),
    );
    args
}

impl InstrumentRunner for McrunExecutor {
    fn run_full_instrument(
        &self,
        instrument: &Instrument,
        request: &RunRequest,
    ) -> Result<Dataset, RunError> {
        check_parameters(instrument, request)?;
        let source = instrument
            .source
            .as_deref()
            .ok_or_else(|| RunError::MissingSource(instrument.name.clone()))?;

        fs::create_dir_all(&self.output_root).map_err(|source| RunError::Folder {
            path: self.output_root.clone(),
            source,
        })?;
        let folder = self.resolve_output_folder(request)?;
        let args = build_arguments(source, &folder, request);

        info!(
            "Running {} into {}",
            instrument.name,
            folder.display()
        );
        debug!("{} {}", self.executable.display(), args.join(" "));

        let output = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| RunError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RunError::ProcessFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let data = load_folder(&folder)?;
        debug!(
            "Loaded {} monitors from {}",
            data.monitors.len(),
            folder.display()
        );
        Ok(data)
    }
}
