//! Monitor plots and histogram views of the latest run.

use std::collections::HashMap;

use eframe::egui;
use egui_plot::{Line, Plot, PlotImage, PlotPoint};

use instr_core::dataset::{MonitorData, MonitorValues};
use instr_core::events::Axis;
use instr_core::histogram::Histogram;
use instr_core::view::{Bins, Colormap, PlotOptions, View};

use crate::app::InstrUiApp;
use crate::plot_interface::{normalize, scale_values, PlotInterface, ViewEditor};
use crate::ui::utils::{colour_map_image, format_value, values_hash};

type TextureCache = HashMap<String, (u64, egui::TextureHandle)>;

const PLOT_HEIGHT: f32 = 300.0;

pub fn render_plot_interface(ui: &mut egui::Ui, app: &mut InstrUiApp) {
    let InstrUiApp {
        interface,
        textures,
        new_view_axis1,
        new_view_axis2,
        ..
    } = app;

    if !interface.has_plot_interface() || interface.plot_interface().data().is_none() {
        ui.centered_and_justified(|ui| {
            ui.weak("Run the instrument to plot its monitors.");
        });
        return;
    }
    let plots = interface.plot_interface();

    render_toolbar(ui, plots);
    ui.separator();

    let is_events = matches!(
        plots.selected_monitor().map(|monitor| &monitor.values),
        Some(MonitorValues::Events(_))
    );
    if let Some(monitor) = plots.selected_monitor() {
        render_monitor(ui, textures, monitor, plots.log_scale, plots.orders_of_magnitude);
    }

    if is_events {
        ui.separator();
        render_views(ui, textures, plots);
        render_add_view(ui, plots, new_view_axis1, new_view_axis2);
    }
}

fn render_toolbar(ui: &mut egui::Ui, plots: &mut PlotInterface) {
    let names: Vec<String> = plots
        .data()
        .map(|data| data.names().map(str::to_string).collect())
        .unwrap_or_default();
    let mut selected = plots.selected_name().unwrap_or_default().to_string();

    ui.horizontal(|ui| {
        ui.label("Monitor");
        egui::ComboBox::from_id_salt("monitor_select")
            .selected_text(selected.clone())
            .show_ui(ui, |ui| {
                for name in &names {
                    ui.selectable_value(&mut selected, name.clone(), name.as_str());
                }
            });
        ui.checkbox(&mut plots.log_scale, "Log scale");
        ui.add_enabled(
            plots.log_scale,
            egui::DragValue::new(&mut plots.orders_of_magnitude)
                .range(1.0..=20.0)
                .speed(0.1)
                .prefix("orders: "),
        );
    });

    if plots.selected_name() != Some(selected.as_str()) {
        plots.select(&selected);
    }
}

fn render_monitor(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    monitor: &MonitorData,
    log_scale: bool,
    orders: f64,
) {
    let title = if monitor.metadata.title.is_empty() {
        monitor.name.clone()
    } else {
        format!("{} ({})", monitor.name, monitor.metadata.title)
    };
    ui.strong(title);
    ui.weak(format!(
        "{} monitor, total intensity {}",
        monitor.kind(),
        format_value(monitor.total_intensity())
    ));

    match &monitor.values {
        MonitorValues::OneD { x, intensity, .. } => {
            let scaled = scale_values(intensity, log_scale, orders);
            let points: Vec<[f64; 2]> = x
                .iter()
                .copied()
                .zip(scaled)
                .map(|(x, y)| [x, y])
                .collect();
            Plot::new(("monitor_1d", &monitor.name))
                .height(PLOT_HEIGHT)
                .x_axis_label(monitor.metadata.xlabel.clone())
                .y_axis_label(monitor.metadata.ylabel.clone())
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new(monitor.name.clone(), points));
                });
        }
        MonitorValues::TwoD {
            nx,
            ny,
            limits,
            intensity,
            ..
        } => {
            let normalized = normalize(&scale_values(intensity, log_scale, orders));
            render_colour_map(
                ui,
                textures,
                format!("monitor:{}", monitor.name),
                Colormap::default(),
                (*nx, *ny),
                *limits,
                &normalized,
                (&monitor.metadata.xlabel, &monitor.metadata.ylabel),
            );
        }
        MonitorValues::Events(events) => {
            ui.label(format!(
                "{} rays, total weight {}",
                events.len(),
                format_value(events.total_weight())
            ));
        }
    }
}

fn render_colour_map(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    key: String,
    map: Colormap,
    (nx, ny): (usize, usize),
    [xmin, xmax, ymin, ymax]: [f64; 4],
    normalized: &[f64],
    (xlabel, ylabel): (&str, &str),
) {
    if nx == 0 || ny == 0 {
        ui.weak("Empty map");
        return;
    }
    let hash = values_hash(normalized) ^ map as u64;
    let stale = textures
        .get(&key)
        .map(|(cached, _)| *cached != hash)
        .unwrap_or(true);
    if stale {
        let image = colour_map_image(map, nx, ny, normalized);
        let texture = ui
            .ctx()
            .load_texture(key.clone(), image, egui::TextureOptions::NEAREST);
        textures.insert(key.clone(), (hash, texture));
    }
    let Some((_, texture)) = textures.get(&key) else {
        return;
    };

    let center = PlotPoint::new((xmin + xmax) / 2.0, (ymin + ymax) / 2.0);
    let size = [(xmax - xmin) as f32, (ymax - ymin) as f32];
    Plot::new(("colour_map", key.as_str()))
        .height(PLOT_HEIGHT)
        .x_axis_label(xlabel.to_string())
        .y_axis_label(ylabel.to_string())
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(key.clone(), texture.id(), center, size));
        });
}

fn render_views(ui: &mut egui::Ui, textures: &mut TextureCache, plots: &mut PlotInterface) {
    plots.refresh_views();
    let (log_scale, orders) = (plots.log_scale, plots.orders_of_magnitude);

    let mut remove = None;
    let mut edited = false;
    for (index, editor) in plots.views_mut().iter_mut().enumerate() {
        egui::CollapsingHeader::new(editor.title())
            .id_salt(("view", index))
            .default_open(true)
            .show(ui, |ui| {
                edited |= render_view_editor(ui, editor, index);
                if ui.small_button("Remove view").clicked() {
                    remove = Some(index);
                }
                render_histogram(ui, textures, editor, index, log_scale, orders);
            });
    }
    if let Some(index) = remove {
        plots.remove_view(index);
        textures.remove(&format!("view:{index}"));
    }
    if edited || remove.is_some() {
        ui.ctx().request_repaint();
    }
}

/// Axis, bin and limit editors. Returns whether the view changed.
fn render_view_editor(ui: &mut egui::Ui, editor: &mut ViewEditor, index: usize) -> bool {
    let view = editor.view().clone();
    let mut axis1 = view.axis1();
    let mut axis2 = view.axis2();
    let mut bins1 = view.bins().for_axis(0);
    let mut bins2 = view.bins().for_axis(1);
    let mut same_scale = view.same_scale();
    let mut edited = false;

    ui.horizontal(|ui| {
        axis_combo(ui, ("axis1", index), &mut axis1);
        optional_axis_combo(ui, ("axis2", index), &mut axis2);
        ui.label("bins");
        ui.add(egui::DragValue::new(&mut bins1).range(1..=2000));
        if axis2.is_some() {
            ui.add(egui::DragValue::new(&mut bins2).range(1..=2000));
        }
        if ui.checkbox(&mut same_scale, "Same scale").changed() {
            editor.set_same_scale(same_scale);
            edited = true;
        }
    });

    let bins = if axis2.is_some() && bins1 != bins2 {
        Bins::Pair(bins1, bins2)
    } else {
        Bins::Single(bins1)
    };
    if axis1 != view.axis1() || axis2 != view.axis2() || bins != view.bins() {
        editor.set_axes(axis1, axis2, bins);
        edited = true;
    }

    ui.horizontal(|ui| {
        ui.label(axis1.key());
        limit_field(ui, &mut editor.limit_text[0], "start");
        limit_field(ui, &mut editor.limit_text[1], "end");
        if let Some(axis2) = axis2 {
            ui.label(axis2.key());
            limit_field(ui, &mut editor.limit_text[2], "start");
            limit_field(ui, &mut editor.limit_text[3], "end");
        }
        if ui.button("Apply limits").clicked() && editor.apply_limit_text().is_ok() {
            edited = true;
        }
        if ui.button("Auto").clicked() {
            editor.clear_limits();
            edited = true;
        }
    });
    if let Some(error) = &editor.error {
        ui.colored_label(ui.visuals().error_fg_color, error);
    }
    render_plot_options(ui, editor, index);
    edited
}

/// Per-view scale overrides. "global" leaves the plot interface setting in charge.
fn render_plot_options(ui: &mut egui::Ui, editor: &mut ViewEditor, index: usize) {
    let mut options: PlotOptions = editor.view().plot_options();
    ui.horizontal(|ui| {
        ui.label("scale");
        egui::ComboBox::from_id_salt(("view_log", index))
            .selected_text(match options.log_scale {
                None => "global",
                Some(true) => "log",
                Some(false) => "linear",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut options.log_scale, None, "global");
                ui.selectable_value(&mut options.log_scale, Some(false), "linear");
                ui.selectable_value(&mut options.log_scale, Some(true), "log");
            });

        let mut own_orders = options.orders_of_magnitude.is_some();
        ui.checkbox(&mut own_orders, "own orders");
        let mut orders = options.orders_of_magnitude.unwrap_or(5.0);
        ui.add_enabled(
            own_orders,
            egui::DragValue::new(&mut orders).range(1.0..=20.0).speed(0.1),
        );
        options.orders_of_magnitude = own_orders.then_some(orders);

        if editor.view().is_two_dimensional() {
            egui::ComboBox::from_id_salt(("view_colormap", index))
                .selected_text(format!("{:?}", options.colormap))
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut options.colormap, Colormap::Viridis, "Viridis");
                    ui.selectable_value(&mut options.colormap, Colormap::Grey, "Grey");
                });
        }
    });
    if options != editor.view().plot_options() {
        editor.set_plot_options(options);
    }
}

fn limit_field(ui: &mut egui::Ui, text: &mut String, hint: &str) {
    ui.add(
        egui::TextEdit::singleline(text)
            .hint_text(hint)
            .desired_width(64.0),
    );
}

fn axis_combo(ui: &mut egui::Ui, id: impl std::hash::Hash, axis: &mut Axis) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(axis.key())
        .show_ui(ui, |ui| {
            for candidate in Axis::ALL {
                ui.selectable_value(axis, candidate, candidate.label());
            }
        });
}

fn optional_axis_combo(ui: &mut egui::Ui, id: impl std::hash::Hash, axis: &mut Option<Axis>) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(axis.map(Axis::key).unwrap_or("none"))
        .show_ui(ui, |ui| {
            ui.selectable_value(axis, None, "none");
            for candidate in Axis::ALL {
                ui.selectable_value(axis, Some(candidate), candidate.label());
            }
        });
}

fn render_histogram(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    editor: &ViewEditor,
    index: usize,
    log_scale: bool,
    orders: f64,
) {
    let (log_scale, orders) = editor.scale_settings(log_scale, orders);
    match editor.histogram() {
        Some(Ok(Histogram::OneD(hist))) => {
            let scaled = scale_values(&hist.intensity, log_scale, orders);
            let points: Vec<[f64; 2]> = hist
                .binning
                .centers()
                .into_iter()
                .zip(scaled)
                .map(|(x, y)| [x, y])
                .collect();
            Plot::new(("view_1d", index))
                .height(PLOT_HEIGHT)
                .x_axis_label(hist.binning.axis.label())
                .y_axis_label("intensity")
                .show(ui, |plot_ui| {
                    plot_ui.line(Line::new(editor.title(), points));
                });
        }
        Some(Ok(Histogram::TwoD(hist))) => {
            let normalized = normalize(&scale_values(&hist.intensity, log_scale, orders));
            render_colour_map(
                ui,
                textures,
                format!("view:{index}"),
                editor.view().plot_options().colormap,
                (hist.x.bins, hist.y.bins),
                [hist.x.start, hist.x.end, hist.y.start, hist.y.end],
                &normalized,
                (hist.x.axis.label(), hist.y.axis.label()),
            );
        }
        Some(Err(err)) => {
            ui.colored_label(ui.visuals().error_fg_color, err.to_string());
        }
        None => {
            ui.spinner();
        }
    }
}

fn render_add_view(
    ui: &mut egui::Ui,
    plots: &mut PlotInterface,
    axis1: &mut Axis,
    axis2: &mut Option<Axis>,
) {
    ui.horizontal(|ui| {
        ui.label("New view");
        axis_combo(ui, "new_view_axis1", axis1);
        optional_axis_combo(ui, "new_view_axis2", axis2);
        if ui.button("Add view").clicked() {
            let view = View::new(*axis1);
            plots.add_view(match axis2 {
                Some(axis2) => view.with_axis2(*axis2),
                None => view,
            });
        }
    });
}
