use eframe::egui;

use crate::interface::SimInterface;

/// One row per parameter: name, text field, comment. Edits go through `SimInterface::apply`.
pub(super) fn render_parameters(ui: &mut egui::Ui, interface: &mut SimInterface) {
    if interface.textboxes().is_empty() {
        ui.weak("This instrument takes no parameters.");
        return;
    }

    let enabled = !interface.is_busy();
    let mut updates = Vec::new();
    ui.add_enabled_ui(enabled, |ui| {
        egui::Grid::new("parameter_rows")
            .num_columns(3)
            .striped(true)
            .show(ui, |ui| {
                for textbox in interface.textboxes_mut() {
                    ui.label(&textbox.name);
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut textbox.text).desired_width(110.0),
                    );
                    if response.changed() {
                        updates.push(textbox.on_change());
                    }
                    ui.weak(&textbox.comment);
                    ui.end_row();
                }
            });
    });
    for update in updates {
        interface.apply(update);
    }

    if ui
        .add_enabled(enabled, egui::Button::new("Reset to defaults"))
        .clicked()
    {
        interface.reset_parameters();
    }
}
