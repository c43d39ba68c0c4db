use eframe::egui;

use crate::app::InstrUiApp;
use crate::interface::SimInterface;

pub(super) fn render_run_controls(ui: &mut egui::Ui, interface: &mut SimInterface) {
    let busy = interface.is_busy();

    egui::Grid::new("run_settings")
        .num_columns(3)
        .show(ui, |ui| {
            ui.label("ncount");
            let response = ui.add_enabled(
                !busy,
                egui::TextEdit::singleline(&mut interface.ncount_text).desired_width(110.0),
            );
            if response.changed() {
                let text = interface.ncount_text.clone();
                interface.update_ncount(&text);
            }
            feedback(ui, interface.ncount_feedback(), interface.ncount().to_string());
            ui.end_row();

            ui.label("mpi");
            let response = ui.add_enabled(
                !busy,
                egui::TextEdit::singleline(&mut interface.mpi_text).desired_width(110.0),
            );
            if response.changed() {
                let text = interface.mpi_text.clone();
                interface.update_mpi(&text);
            }
            feedback(ui, interface.mpi_feedback(), interface.mpi().to_string());
            ui.end_row();

            ui.label("folder");
            let mut foldername = interface.foldername().to_string();
            let response = ui.add_enabled(
                !busy,
                egui::TextEdit::singleline(&mut foldername).desired_width(110.0),
            );
            if response.changed() {
                interface.set_foldername(foldername);
            }
            ui.end_row();
        });

    ui.horizontal(|ui| {
        let label = if busy { "⏳ Running" } else { "▶ Run" };
        if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
            interface.request_run();
        }
        if busy {
            ui.spinner();
        }
    });
}

/// Rejection reason in the error colour, or the value in effect.
fn feedback(ui: &mut egui::Ui, rejection: Option<&str>, current: String) {
    match rejection {
        Some(reason) => {
            ui.colored_label(ui.visuals().error_fg_color, reason);
        }
        None => {
            ui.weak(current);
        }
    }
}

pub(super) fn render_status(ui: &mut egui::Ui, app: &InstrUiApp) {
    if let Some(error) = app.interface.last_error() {
        ui.colored_label(ui.visuals().error_fg_color, error);
    } else if let Some(status) = &app.status {
        ui.label(status);
    }
    ui.weak(format!("Runs completed: {}", app.interface.runs_completed()));
}
