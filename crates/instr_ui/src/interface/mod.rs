//! Toolkit-free state behind the simulation interface.
//!
//! Widgets never write shared state directly: every edit becomes an
//! [`InterfaceUpdate`] that [`SimInterface::apply`] reduces.

mod parameter_textbox;
mod sim_interface;


pub use parameter_textbox::ParameterTextbox;
pub use sim_interface::SimInterface;

/// A named edit coming from one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceUpdate {
    /// Raw text for one instrument parameter.
    Parameter { name: String, value: String },
    Ncount(String),
    Mpi(String),
}

/// Whether an update changed the interface state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The prior value is kept; the reason is shown next to the field.
    Rejected(String),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}
