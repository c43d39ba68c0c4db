//! Run requests and the seam to whatever executes an instrument.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::dataset::Dataset;
use crate::histogram::HistogramError;
use crate::instrument::{Instrument, ParameterMap};
use crate::loader::LoadError;

pub const DEFAULT_FOLDER_NAME: &str = "interface";
pub const DEFAULT_NCOUNT_TEXT: &str = "1E6";
pub const DEFAULT_NCOUNT: u64 = 1_000_000;
pub const DEFAULT_MPI_TEXT: &str = "disabled";

/// Why a typed run setting was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' is not finite")]
    NonFinite(String),
    #[error("'{0}' is below one ray")]
    TooSmall(String),
    #[error("'{0}' is too large")]
    TooLarge(String),
    #[error("'{0}' is neither 'disabled' nor an integer")]
    NotAnInteger(String),
    #[error("mpi needs at least one process, got {0}")]
    NotPositive(i64),
}

/// Parse a ray count. Scientific notation is accepted; fractions are truncated toward zero.
///
/// A count that truncates below one ray, including zero and negatives, is
/// rejected as [`SettingError::TooSmall`].
pub fn parse_ncount(text: &str) -> Result<u64, SettingError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| SettingError::NotANumber(text.to_string()))?;
    if !value.is_finite() {
        return Err(SettingError::NonFinite(text.to_string()));
    }
    let truncated = value.trunc();
    if truncated < 1.0 {
        return Err(SettingError::TooSmall(text.to_string()));
    }
    if truncated >= u64::MAX as f64 {
        return Err(SettingError::TooLarge(text.to_string()));
    }
    Ok(truncated as u64)
}

/// Number of MPI processes for a run, or none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MpiSetting {
    #[default]
    Disabled,
    Processes(u32),
}

impl MpiSetting {
    pub fn processes(self) -> Option<u32> {
        match self {
            MpiSetting::Disabled => None,
            MpiSetting::Processes(n) => Some(n),
        }
    }
}

impl FromStr for MpiSetting {
    type Err = SettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == DEFAULT_MPI_TEXT {
            return Ok(MpiSetting::Disabled);
        }
        let value: i64 = trimmed
            .parse()
            .map_err(|_| SettingError::NotAnInteger(s.to_string()))?;
        if value < 1 {
            return Err(SettingError::NotPositive(value));
        }
        u32::try_from(value)
            .map(MpiSetting::Processes)
            .map_err(|_| SettingError::TooLarge(s.to_string()))
    }
}

impl fmt::Display for MpiSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpiSetting::Disabled => f.write_str(DEFAULT_MPI_TEXT),
            MpiSetting::Processes(n) => write!(f, "{n}"),
        }
    }
}

/// Arguments for one full instrument run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub foldername: String,
    pub increment_folder_name: bool,
    pub parameters: ParameterMap,
    pub ncount: u64,
    /// Absent when MPI is disabled.
    pub mpi: Option<u32>,
}

impl RunRequest {
    pub fn new(parameters: ParameterMap, ncount: u64) -> Self {
        Self {
            foldername: DEFAULT_FOLDER_NAME.to_string(),
            increment_folder_name: true,
            parameters,
            ncount,
            mpi: None,
        }
    }

    pub fn with_mpi(mut self, mpi: MpiSetting) -> Self {
        self.mpi = mpi.processes();
        self
    }

    pub fn with_foldername(mut self, foldername: impl Into<String>) -> Self {
        self.foldername = foldername.into();
        self
    }

    pub fn with_increment_folder_name(mut self, increment: bool) -> Self {
        self.increment_folder_name = increment;
        self
    }
}

impl fmt::Display for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "foldername={} increment_folder_name={} ncount={}",
            self.foldername, self.increment_folder_name, self.ncount
        )?;
        if let Some(mpi) = self.mpi {
            write!(f, " mpi={mpi}")?;
        }
        f.write_str(" parameters={")?;
        for (i, (name, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("parameter '{0}' has no default and was not given a value")]
    MissingParameter(String),
    #[error("instrument has no parameter named '{0}'")]
    UnknownParameter(String),
    #[error("parameter '{name}' has unusable value '{value}'")]
    InvalidParameter { name: String, value: String },
    #[error("instrument '{0}' has no source file to run")]
    MissingSource(String),
    #[error("output folder '{}' already exists", .0.display())]
    FolderExists(PathBuf),
    #[error("failed to prepare output folder '{}': {source}", path.display())]
    Folder {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to start '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("simulation exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },
    #[error("worker pool: {0}")]
    Pool(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Histogram(#[from] HistogramError),
}

/// Executes an instrument and returns what its monitors recorded.
pub trait InstrumentRunner {
    fn run_full_instrument(
        &self,
        instrument: &Instrument,
        request: &RunRequest,
    ) -> Result<Dataset, RunError>;
}

impl<R: InstrumentRunner + ?Sized> InstrumentRunner for Box<R> {
    fn run_full_instrument(
        &self,
        instrument: &Instrument,
        request: &RunRequest,
    ) -> Result<Dataset, RunError> {
        (**self).run_full_instrument(instrument, request)
    }
}

/// Every parameter without a default needs a value, and only declared parameters may be set.
pub fn check_parameters(instrument: &Instrument, request: &RunRequest) -> Result<(), RunError> {
    if let Some(unknown) = request
        .parameters
        .keys()
        .find(|name| instrument.parameter(name).is_none())
    {
        return Err(RunError::UnknownParameter(unknown.clone()));
    }
    if let Some(missing) = instrument.parameter_list.iter().find(|parameter| {
        !parameter.has_default() && !request.parameters.contains_key(&parameter.name)
    }) {
        return Err(RunError::MissingParameter(missing.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{ParameterValue, ParameterVariable};

    #[test]
    fn ncount_accepts_scientific_notation_and_truncates() {
        assert_eq!(parse_ncount(DEFAULT_NCOUNT_TEXT), Ok(DEFAULT_NCOUNT));
        assert_eq!(parse_ncount("2.5e3"), Ok(2500));
        assert_eq!(parse_ncount(" 42.9 "), Ok(42));
    }

    #[test]
    fn ncount_rejects_unusable_text() {
        assert!(matches!(parse_ncount("abc"), Err(SettingError::NotANumber(_))));
        assert!(matches!(parse_ncount(""), Err(SettingError::NotANumber(_))));
        assert!(matches!(parse_ncount("inf"), Err(SettingError::NonFinite(_))));
        assert!(matches!(parse_ncount("NaN"), Err(SettingError::NonFinite(_))));
        assert!(matches!(parse_ncount("0.5"), Err(SettingError::TooSmall(_))));
        assert!(matches!(parse_ncount("-10"), Err(SettingError::TooSmall(_))));
        assert!(matches!(parse_ncount("1e30"), Err(SettingError::TooLarge(_))));
    }

    #[test]
    fn mpi_accepts_disabled_or_positive_integers() {
        assert_eq!("disabled".parse::<MpiSetting>(), Ok(MpiSetting::Disabled));
        assert_eq!("4".parse::<MpiSetting>(), Ok(MpiSetting::Processes(4)));
        assert_eq!(" 8 ".parse::<MpiSetting>(), Ok(MpiSetting::Processes(8)));
        assert_eq!(
            "foo".parse::<MpiSetting>(),
            Err(SettingError::NotAnInteger("foo".to_string()))
        );
        assert_eq!("0".parse::<MpiSetting>(), Err(SettingError::NotPositive(0)));
        assert_eq!("-2".parse::<MpiSetting>(), Err(SettingError::NotPositive(-2)));
        assert!("2.0".parse::<MpiSetting>().is_err());
        assert_eq!(MpiSetting::Processes(3).to_string(), "3");
    }

    #[test]
    fn request_omits_mpi_when_disabled() {
        let request = RunRequest::new(ParameterMap::new(), 10).with_mpi(MpiSetting::Disabled);
        assert_eq!(request.mpi, None);
        assert_eq!(request.foldername, DEFAULT_FOLDER_NAME);
        assert!(request.increment_folder_name);

        let request = request.with_mpi(MpiSetting::Processes(2));
        assert_eq!(request.mpi, Some(2));
    }

    #[test]
    fn request_display_lists_parameters() {
        let mut parameters = ParameterMap::new();
        parameters.insert("A".to_string(), ParameterValue::from("5"));
        parameters.insert("B".to_string(), ParameterValue::Float(1.5));
        let request = RunRequest::new(parameters, 10_000).with_mpi(MpiSetting::Processes(4));
        assert_eq!(
            request.to_string(),
            "foldername=interface increment_folder_name=true ncount=10000 mpi=4 parameters={A: 5, B: 1.5}"
        );
    }

    #[test]
    fn parameter_check_reports_missing_and_unknown() {
        let mut instrument = Instrument::new("test");
        instrument
            .add_parameter(ParameterVariable::new("A").with_default(1_i64))
            .expect("add");
        instrument
            .add_parameter(ParameterVariable::new("B"))
            .expect("add");

        let request = RunRequest::new(ParameterMap::new(), 1);
        assert!(matches!(
            check_parameters(&instrument, &request),
            Err(RunError::MissingParameter(name)) if name == "B"
        ));

        let mut parameters = ParameterMap::new();
        parameters.insert("B".to_string(), ParameterValue::from("2"));
        parameters.insert("C".to_string(), ParameterValue::from("3"));
        let request = RunRequest::new(parameters, 1);
        assert!(matches!(
            check_parameters(&instrument, &request),
            Err(RunError::UnknownParameter(name)) if name == "C"
        ));
    }
}
