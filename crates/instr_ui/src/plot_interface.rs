//! Plot state for the data of the latest run: which monitor is shown, how it is
//! scaled, and the histogram views drawn for event monitors.
//!
//! Rendering lives in [`crate::ui::plots`]; this module holds no toolkit types.

use instr_core::dataset::{Dataset, MonitorData, MonitorValues};
use instr_core::events::{Axis, EventData};
use instr_core::histogram::{auto_range, histogram, Histogram, HistogramError};
use instr_core::view::{Bins, PlotOptions, View};
use log::warn;

pub const DEFAULT_ORDERS_OF_MAGNITUDE: f64 = 5.0;

/// Histogram view of event data together with its editable limit text.
#[derive(Debug, Clone)]
pub struct ViewEditor {
    view: View,
    /// axis1 start, axis1 end, axis2 start, axis2 end.
    pub limit_text: [String; 4],
    pub error: Option<String>,
    held1: Option<(f64, f64)>,
    held2: Option<(f64, f64)>,
    cached: Option<Result<Histogram, HistogramError>>,
}

impl ViewEditor {
    pub fn new(view: View) -> Self {
        let mut limit_text: [String; 4] = Default::default();
        if let Some((start, end)) = view.axis1_limits() {
            limit_text[0] = start.to_string();
            limit_text[1] = end.to_string();
        }
        if let Some((start, end)) = view.axis2_limits() {
            limit_text[2] = start.to_string();
            limit_text[3] = end.to_string();
        }
        Self {
            view,
            limit_text,
            error: None,
            held1: None,
            held2: None,
            cached: None,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn histogram(&self) -> Option<&Result<Histogram, HistogramError>> {
        self.cached.as_ref()
    }

    pub fn title(&self) -> String {
        match self.view.axis2() {
            Some(axis2) => format!("{} vs {}", self.view.axis1().label(), axis2.label()),
            None => self.view.axis1().label().to_string(),
        }
    }

    /// Switch axes or bins. Limits are dropped because they belonged to the old axes.
    pub fn set_axes(&mut self, axis1: Axis, axis2: Option<Axis>, bins: Bins) {
        if axis1 == self.view.axis1() && axis2 == self.view.axis2() && bins == self.view.bins() {
            return;
        }
        self.view = rebuild(
            axis1,
            axis2,
            bins,
            self.view.same_scale(),
            self.view.plot_options(),
        );
        self.limit_text = Default::default();
        self.error = None;
        self.reset_scale();
    }

    pub fn set_same_scale(&mut self, same_scale: bool) {
        if same_scale == self.view.same_scale() {
            return;
        }
        let mut view = rebuild(
            self.view.axis1(),
            self.view.axis2(),
            self.view.bins(),
            same_scale,
            self.view.plot_options(),
        );
        copy_limits(&self.view, &mut view);
        self.view = view;
        self.reset_scale();
    }

    /// Apply the limit text. An axis whose two fields are both empty is auto-ranged.
    ///
    /// On any error the view keeps its previous limits and the message is kept in `error`.
    pub fn apply_limit_text(&mut self) -> Result<(), String> {
        let result = self.limits_from_text();
        match result {
            Ok(view) => {
                self.view = view;
                self.error = None;
                self.reset_scale();
                Ok(())
            }
            Err(message) => {
                self.error = Some(message.clone());
                Err(message)
            }
        }
    }

    /// Rendering options only; the cached histogram stays valid.
    pub fn set_plot_options(&mut self, plot_options: PlotOptions) {
        self.view.set_plot_options(plot_options);
    }

    /// Log flag and orders for this view, given the plot interface's global values.
    pub fn scale_settings(&self, log_scale: bool, orders_of_magnitude: f64) -> (bool, f64) {
        self.view
            .plot_options()
            .resolve(log_scale, orders_of_magnitude)
    }

    pub fn clear_limits(&mut self) {
        self.view.clear_limits();
        self.limit_text = Default::default();
        self.error = None;
        self.reset_scale();
    }

    fn limits_from_text(&self) -> Result<View, String> {
        let mut view = rebuild(
            self.view.axis1(),
            self.view.axis2(),
            self.view.bins(),
            self.view.same_scale(),
            self.view.plot_options(),
        );
        if let Some((start, end)) = parse_pair(&self.limit_text[0], &self.limit_text[1])? {
            view.set_axis1_limits(start, end)
                .map_err(|error| error.to_string())?;
        }
        if view.axis2().is_some() {
            if let Some((start, end)) = parse_pair(&self.limit_text[2], &self.limit_text[3])? {
                view.set_axis2_limits(start, end)
                    .map_err(|error| error.to_string())?;
            }
        }
        Ok(view)
    }

    fn reset_scale(&mut self) {
        self.held1 = None;
        self.held2 = None;
        self.cached = None;
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Histogram `events`. With `same_scale`, auto-ranged axes keep growing to cover
    /// every data set rendered since the last change to the view.
    fn refresh(&mut self, events: &EventData) {
        if self.cached.is_some() {
            return;
        }
        let mut effective = self.view.clone();
        if self.view.same_scale() {
            if self.view.axis1_limits().is_none() {
                self.held1 = union(self.held1, auto_range(events.quantity(self.view.axis1())));
                if let Some((start, end)) = self.held1 {
                    if let Err(error) = effective.set_axis1_limits(start, end) {
                        warn!("Held {} range not applied: {error}", self.view.axis1());
                    }
                }
            }
            if let (Some(axis2), None) = (self.view.axis2(), self.view.axis2_limits()) {
                self.held2 = union(self.held2, auto_range(events.quantity(axis2)));
                if let Some((start, end)) = self.held2 {
                    if let Err(error) = effective.set_axis2_limits(start, end) {
                        warn!("Held {axis2} range not applied: {error}");
                    }
                }
            }
        }
        self.cached = Some(histogram(events, &effective));
    }
}

fn rebuild(
    axis1: Axis,
    axis2: Option<Axis>,
    bins: Bins,
    same_scale: bool,
    plot_options: PlotOptions,
) -> View {
    let view = View::new(axis1)
        .with_bins(bins)
        .with_same_scale(same_scale)
        .with_plot_options(plot_options);
    match axis2 {
        Some(axis2) => view.with_axis2(axis2),
        None => view,
    }
}

fn copy_limits(from: &View, to: &mut View) {
    if let Some((start, end)) = from.axis1_limits() {
        if let Err(error) = to.set_axis1_limits(start, end) {
            warn!("Limits on {} not copied: {error}", from.axis1());
        }
    }
    if let Some((start, end)) = from.axis2_limits() {
        if let Err(error) = to.set_axis2_limits(start, end) {
            warn!("Limits on second axis not copied: {error}");
        }
    }
}

fn parse_pair(start: &str, end: &str) -> Result<Option<(f64, f64)>, String> {
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() && end.is_empty() {
        return Ok(None);
    }
    let parse = |text: &str| {
        text.parse::<f64>()
            .map_err(|_| format!("'{text}' is not a number"))
    };
    Ok(Some((parse(start)?, parse(end)?)))
}

fn union(held: Option<(f64, f64)>, next: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (held, next) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (held, None) => held,
        (None, next) => next,
    }
}

/// Views added the first time event data shows up.
pub fn default_views() -> Vec<View> {
    vec![
        View::new(Axis::L),
        View::new(Axis::X).with_axis2(Axis::Y),
        View::new(Axis::Dx).with_axis2(Axis::Dy),
    ]
}

#[derive(Debug, Clone)]
pub struct PlotInterface {
    data: Option<Dataset>,
    selected: Option<String>,
    pub log_scale: bool,
    pub orders_of_magnitude: f64,
    views: Vec<ViewEditor>,
    revision: u64,
}

impl Default for PlotInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotInterface {
    pub fn new() -> Self {
        Self {
            data: None,
            selected: None,
            log_scale: false,
            orders_of_magnitude: DEFAULT_ORDERS_OF_MAGNITUDE,
            views: Vec::new(),
            revision: 0,
        }
    }

    /// Replace the shown data. The selected monitor survives when the new data has one of the same name.
    pub fn set_data(&mut self, data: Dataset) {
        let keep = self
            .selected
            .as_deref()
            .map(|name| data.monitors.iter().any(|monitor| monitor.name == name))
            .unwrap_or(false);
        if !keep {
            self.selected = data.monitors.first().map(|monitor| monitor.name.clone());
        }
        if self.views.is_empty() && data.event_monitors().next().is_some() {
            self.views = default_views().into_iter().map(ViewEditor::new).collect();
        }
        self.data = Some(data);
        self.revision += 1;
        for editor in &mut self.views {
            editor.invalidate();
        }
    }

    pub fn data(&self) -> Option<&Dataset> {
        self.data.as_ref()
    }

    /// Bumped on every `set_data`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, name: &str) -> bool {
        let exists = self
            .data
            .as_ref()
            .map(|data| data.monitors.iter().any(|monitor| monitor.name == name))
            .unwrap_or(false);
        if exists && self.selected.as_deref() != Some(name) {
            self.selected = Some(name.to_string());
            for editor in &mut self.views {
                editor.reset_scale();
            }
        }
        exists
    }

    pub fn selected_monitor(&self) -> Option<&MonitorData> {
        let data = self.data.as_ref()?;
        let name = self.selected.as_deref()?;
        data.monitors.iter().find(|monitor| monitor.name == name)
    }

    pub fn views(&self) -> &[ViewEditor] {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut [ViewEditor] {
        &mut self.views
    }

    pub fn add_view(&mut self, view: View) {
        self.views.push(ViewEditor::new(view));
    }

    pub fn remove_view(&mut self, index: usize) -> Option<ViewEditor> {
        (index < self.views.len()).then(|| self.views.remove(index))
    }

    /// Histogram every view over the selected event monitor, reusing cached results.
    pub fn refresh_views(&mut self) {
        let Some(name) = self.selected.as_deref() else {
            return;
        };
        let values = self
            .data
            .as_ref()
            .and_then(|data| data.monitors.iter().find(|monitor| monitor.name == name))
            .map(|monitor| &monitor.values);
        let Some(MonitorValues::Events(events)) = values else {
            return;
        };
        for editor in &mut self.views {
            editor.refresh(events);
        }
    }
}

/// Values prepared for display: optionally log10, floored `orders` decades below the maximum.
///
/// Non-positive values map to the floor. Without any positive value the result is all zeros.
pub fn scale_values(values: &[f64], log_scale: bool, orders: f64) -> Vec<f64> {
    if !log_scale {
        return values.to_vec();
    }
    let max = values
        .iter()
        .copied()
        .filter(|value| *value > 0.0 && value.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![0.0; values.len()];
    }
    let floor = max.log10() - orders.max(0.0);
    values
        .iter()
        .map(|value| {
            if *value > 0.0 {
                value.log10().max(floor)
            } else {
                floor
            }
        })
        .collect()
}

/// Map values to `[0, 1]` by their min and max. A flat input maps to zeros.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });
    let span = max - min;
    values
        .iter()
        .map(|value| {
            if span > 0.0 && value.is_finite() {
                (value - min) / span
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use instr_core::dataset::MonitorMetadata;
    use instr_core::events::Ray;

    fn one_d(name: &str) -> MonitorData {
        MonitorData {
            name: name.to_string(),
            metadata: MonitorMetadata::default(),
            values: MonitorValues::OneD {
                x: vec![0.0, 1.0],
                intensity: vec![1.0, 2.0],
                error: vec![0.0, 0.0],
                events: vec![1.0, 1.0],
            },
        }
    }

    fn event_monitor(name: &str, speeds: &[f64]) -> MonitorData {
        let rays = speeds
            .iter()
            .map(|&vz| Ray {
                p: 1.0,
                vz,
                ..Ray::default()
            })
            .collect();
        MonitorData {
            name: name.to_string(),
            metadata: MonitorMetadata::default(),
            values: MonitorValues::Events(EventData::new(rays)),
        }
    }

    #[test]
    fn set_data_keeps_selection_by_name() {
        let mut plots = PlotInterface::new();
        plots.set_data(Dataset::new(vec![one_d("a"), one_d("b")]));
        assert_eq!(plots.selected_name(), Some("a"));
        assert!(plots.select("b"));

        plots.set_data(Dataset::new(vec![one_d("b"), one_d("c")]));
        assert_eq!(plots.selected_name(), Some("b"));

        plots.set_data(Dataset::new(vec![one_d("c")]));
        assert_eq!(plots.selected_name(), Some("c"));
        assert!(!plots.select("missing"));
        assert_eq!(plots.revision(), 3);
    }

    #[test]
    fn event_data_brings_default_views() {
        let mut plots = PlotInterface::new();
        plots.set_data(Dataset::new(vec![one_d("a")]));
        assert!(plots.views().is_empty());

        plots.set_data(Dataset::new(vec![event_monitor("events", &[100.0, 200.0])]));
        assert_eq!(plots.views().len(), default_views().len());
        plots.refresh_views();
        assert!(plots.views().iter().all(|editor| editor.histogram().is_some()));
    }

    #[test]
    fn same_scale_range_grows_across_runs() {
        let mut plots = PlotInterface::new();
        plots.add_view(View::new(Axis::Vz).with_bins(10));

        plots.set_data(Dataset::new(vec![event_monitor("events", &[100.0, 200.0])]));
        plots.refresh_views();
        plots.set_data(Dataset::new(vec![event_monitor("events", &[300.0, 400.0])]));
        plots.refresh_views();

        let Some(Ok(Histogram::OneD(hist))) = plots.views()[0].histogram() else {
            panic!("expected a 1D histogram");
        };
        assert!(hist.binning.start <= 100.0);
        assert!(hist.binning.end >= 400.0);
        assert_eq!(hist.events.iter().sum::<u64>(), 2);
    }

    #[test]
    fn without_same_scale_each_run_is_auto_ranged() {
        let mut plots = PlotInterface::new();
        plots.add_view(View::new(Axis::Vz).with_same_scale(false));
        plots.set_data(Dataset::new(vec![event_monitor("events", &[100.0, 200.0])]));
        plots.refresh_views();
        plots.set_data(Dataset::new(vec![event_monitor("events", &[300.0, 400.0])]));
        plots.refresh_views();

        let Some(Ok(Histogram::OneD(hist))) = plots.views()[0].histogram() else {
            panic!("expected a 1D histogram");
        };
        assert!(hist.binning.start > 200.0);
    }

    #[test]
    fn limit_text_rejects_bad_input_and_keeps_previous_limits() {
        let mut editor = ViewEditor::new(View::new(Axis::L).with_axis2(Axis::T));
        editor.limit_text = ["1".into(), "2".into(), String::new(), String::new()];
        editor.apply_limit_text().expect("valid limits");
        assert_eq!(editor.view().axis1_limits(), Some((1.0, 2.0)));
        assert_eq!(editor.view().axis2_limits(), None);

        editor.limit_text[1] = "0".into();
        assert!(editor.apply_limit_text().is_err());
        assert!(editor.error.as_deref().unwrap_or_default().contains("start point over end"));
        assert_eq!(editor.view().axis1_limits(), Some((1.0, 2.0)));

        editor.limit_text[1] = "two".into();
        assert!(editor.apply_limit_text().is_err());
        assert_eq!(editor.view().axis1_limits(), Some((1.0, 2.0)));

        editor.clear_limits();
        assert_eq!(editor.view().axis1_limits(), None);
        assert!(editor.limit_text.iter().all(String::is_empty));
    }

    #[test]
    fn changing_axes_drops_limits() {
        let mut editor = ViewEditor::new(View::new(Axis::L));
        editor.limit_text = ["1".into(), "2".into(), String::new(), String::new()];
        editor.apply_limit_text().expect("valid limits");
        editor.set_axes(Axis::X, Some(Axis::Y), Bins::Pair(10, 20));
        assert_eq!(editor.view().axis2(), Some(Axis::Y));
        assert_eq!(editor.view().axis1_limits(), None);
        assert_eq!(editor.title(), format!("{} vs {}", Axis::X.label(), Axis::Y.label()));
    }

    #[test]
    fn view_plot_options_override_global_scale_and_survive_edits() {
        let mut plots = PlotInterface::new();
        plots.set_data(Dataset::new(vec![event_monitor("events", &[1000.0, 2000.0])]));
        plots.refresh_views();

        let editor = &mut plots.views_mut()[0];
        assert_eq!(editor.scale_settings(false, 5.0), (false, 5.0));
        editor.set_plot_options(PlotOptions {
            log_scale: Some(true),
            orders_of_magnitude: Some(2.0),
            ..Default::default()
        });
        assert!(editor.histogram().is_some());
        assert_eq!(editor.scale_settings(false, 5.0), (true, 2.0));

        editor.set_same_scale(false);
        editor.set_axes(Axis::Speed, None, Bins::Single(10));
        editor.limit_text = ["0".into(), "3000".into(), String::new(), String::new()];
        editor.apply_limit_text().expect("valid limits");
        assert_eq!(editor.view().plot_options().log_scale, Some(true));
        assert_eq!(editor.view().plot_options().orders_of_magnitude, Some(2.0));
    }

    #[test]
    fn log_scale_floors_small_values() {
        let scaled = scale_values(&[1000.0, 1.0, 0.0, 1e-9], true, 2.0);
        let expected = [3.0, 1.0, 1.0, 1.0];
        for (value, expected) in scaled.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-12, "{value} != {expected}");
        }
        assert_eq!(scale_values(&[0.0, -1.0], true, 2.0), vec![0.0, 0.0]);
        assert_eq!(scale_values(&[2.0, 3.0], false, 2.0), vec![2.0, 3.0]);
    }

    #[test]
    fn normalize_maps_to_unit_range() {
        assert_eq!(normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(normalize(&[4.0, 4.0]), vec![0.0, 0.0]);
    }
}
