//! Parameter rows and run controls of the simulation interface.

mod parameters;
mod run_controls;

use eframe::egui;

use crate::app::InstrUiApp;
use crate::ui::controls::parameters::render_parameters;
use crate::ui::controls::run_controls::{render_run_controls, render_status};

pub fn render_control_panel(ui: &mut egui::Ui, app: &mut InstrUiApp) {
    ui.heading(&app.interface.instrument().name);
    if let Some(source) = &app.interface.instrument().source {
        ui.weak(source.display().to_string());
    }

    egui::CollapsingHeader::new("Parameters")
        .default_open(true)
        .show(ui, |ui| {
            render_parameters(ui, &mut app.interface);
        });

    egui::CollapsingHeader::new("Run")
        .default_open(true)
        .show(ui, |ui| {
            render_run_controls(ui, &mut app.interface);
        });

    ui.separator();
    render_status(ui, app);
}
