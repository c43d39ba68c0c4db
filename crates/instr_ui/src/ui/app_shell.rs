use eframe::egui;

use crate::app::InstrUiApp;
use crate::ui::controls::render_control_panel;
use crate::ui::plots::render_plot_interface;

pub fn run(app: InstrUiApp) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };
    let title = format!("{} - instrument interface", app.interface.instrument().name);
    eframe::run_native(&title, options, Box::new(move |_cc| Ok(Box::new(app))))
}

impl eframe::App for InstrUiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(result) = self.interface.run_if_requested() {
            self.record_run(result);
        }
        if self.interface.is_busy() {
            ctx.request_repaint();
        }

        egui::SidePanel::left("sim_interface")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    render_control_panel(ui, self);
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                render_plot_interface(ui, self);
            });
        });

        self.persist_settings();
    }
}
