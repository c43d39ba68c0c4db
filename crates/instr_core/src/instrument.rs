//! Instrument descriptor: a named list of parameter variables with optional defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current value of one instrument parameter, keyed by parameter name.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// Value of an instrument parameter.
///
/// Defaults declared by an instrument are typed; values typed into the interface
/// arrive as [`ParameterValue::Text`] and are passed on without coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric reading of the value. Text is parsed as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int(value) => Some(*value as f64),
            ParameterValue::Float(value) => Some(*value),
            ParameterValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(value) => write!(f, "{value}"),
            ParameterValue::Float(value) => write!(f, "{value}"),
            ParameterValue::Text(text) => write!(f, "{text}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// Declared type of an instrument parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    Double,
    Int,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVariable {
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default, rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub default: Option<ParameterValue>,
}

impl ParameterVariable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: String::new(),
            kind: ParameterType::default(),
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<ParameterValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_kind(mut self, kind: ParameterType) -> Self {
        self.kind = kind;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_value(&self) -> Option<&ParameterValue> {
        self.default.as_ref()
    }
}

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),
    #[error("parameter name must not be empty")]
    EmptyParameterName,
    #[error("failed to read instrument file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid instrument file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Instrument as seen by the interface: a name, its parameters and, for process
/// runners, the instrument source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    #[serde(default, rename = "parameters")]
    pub parameter_list: Vec<ParameterVariable>,
    #[serde(default)]
    pub source: Option<PathBuf>,
}

impl Instrument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter_list: Vec::new(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn add_parameter(&mut self, parameter: ParameterVariable) -> Result<(), InstrumentError> {
        if parameter.name.trim().is_empty() {
            return Err(InstrumentError::EmptyParameterName);
        }
        if self.parameter(&parameter.name).is_some() {
            return Err(InstrumentError::DuplicateParameter(parameter.name));
        }
        self.parameter_list.push(parameter);
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterVariable> {
        self.parameter_list.iter().find(|parameter| parameter.name == name)
    }

    /// Parameters that declare a default, mapped to that default.
    /// Parameters without a default are absent.
    pub fn default_parameters(&self) -> ParameterMap {
        self.parameter_list
            .iter()
            .filter_map(|parameter| {
                parameter
                    .default_value()
                    .map(|value| (parameter.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Load a JSON instrument descriptor. A relative `source` is resolved
    /// against the descriptor's directory.
    pub fn from_json_file(path: &Path) -> Result<Self, InstrumentError> {
        let contents = fs::read_to_string(path).map_err(|source| InstrumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut instrument = Self::from_json_str(&contents).map_err(|error| match error {
            InstrumentError::Parse { source, .. } => InstrumentError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        if let (Some(source), Some(parent)) = (instrument.source.as_ref(), path.parent()) {
            if source.is_relative() {
                instrument.source = Some(parent.join(source));
            }
        }
        Ok(instrument)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, InstrumentError> {
        let parsed: Instrument =
            serde_json::from_str(contents).map_err(|source| InstrumentError::Parse {
                path: PathBuf::new(),
                source,
            })?;

        let Instrument {
            name,
            parameter_list,
            source,
        } = parsed;

        // Re-add through the checked path so duplicates are rejected.
        let mut instrument = Instrument {
            name,
            parameter_list: Vec::with_capacity(parameter_list.len()),
            source,
        };
        for parameter in parameter_list {
            instrument.add_parameter(parameter)?;
        }
        Ok(instrument)
    }
}
