//! egui rendering for the interface and plot state.

pub mod app_shell;
pub mod controls;
pub mod plots;
pub mod utils;
