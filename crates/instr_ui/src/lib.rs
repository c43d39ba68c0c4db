//! Desktop interface for configuring instrument runs and plotting their monitors.
//!
//! [`interface`], [`plot_interface`] and [`settings`] hold the toolkit-free state;
//! [`ui`] renders it with egui.

pub mod app;
pub mod interface;
pub mod plot_interface;
pub mod settings;
pub mod ui;
