use instr_core::instrument::ParameterVariable;

use super::InterfaceUpdate;

/// Text field bound to one instrument parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTextbox {
    pub name: String,
    pub comment: String,
    pub text: String,
}

impl ParameterTextbox {
    /// Starts from the parameter's default, or an empty field when it has none.
    pub fn new(parameter: &ParameterVariable) -> Self {
        Self {
            name: parameter.name.clone(),
            comment: parameter.comment.clone(),
            text: parameter
                .default_value()
                .map(|value| value.to_string())
                .unwrap_or_default(),
        }
    }

    /// Update carrying the raw field contents. No parsing happens here.
    pub fn on_change(&self) -> InterfaceUpdate {
        InterfaceUpdate::Parameter {
            name: self.name.clone(),
            value: self.text.clone(),
        }
    }
}
