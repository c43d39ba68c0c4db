//! Plot view on one or two axes, generated from event data.

use thiserror::Error;

use crate::events::Axis;

pub const DEFAULT_BINS: usize = 100;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("start point over end for this view ({start} > {end})")]
    InvalidRange { start: f64, end: f64 },
    #[error("unknown axis specifier '{0}'")]
    UnknownAxis(String),
}

/// Histogram resolution: one count for every axis, or one per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bins {
    Single(usize),
    Pair(usize, usize),
}

impl Bins {
    /// Bin count for axis `index` (0 or 1).
    pub fn for_axis(self, index: usize) -> usize {
        match (self, index) {
            (Bins::Single(n), _) => n,
            (Bins::Pair(n, _), 0) => n,
            (Bins::Pair(_, n), _) => n,
        }
    }
}

impl Default for Bins {
    fn default() -> Self {
        Bins::Single(DEFAULT_BINS)
    }
}

impl From<usize> for Bins {
    fn from(value: usize) -> Self {
        Bins::Single(value)
    }
}

impl From<(usize, usize)> for Bins {
    fn from((first, second): (usize, usize)) -> Self {
        Bins::Pair(first, second)
    }
}

/// Colour scale for 2D views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Colormap {
    #[default]
    Viridis,
    Grey,
}

/// Per-view plotting options handed to the renderer along with the histogram.
///
/// `None` fields fall back to the plot interface's global setting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlotOptions {
    pub log_scale: Option<bool>,
    pub orders_of_magnitude: Option<f64>,
    pub colormap: Colormap,
}

impl PlotOptions {
    /// Log flag and orders of magnitude after applying the overrides to the global values.
    pub fn resolve(&self, log_scale: bool, orders_of_magnitude: f64) -> (bool, f64) {
        (
            self.log_scale.unwrap_or(log_scale),
            self.orders_of_magnitude.unwrap_or(orders_of_magnitude),
        )
    }
}

/// Which quantities to histogram, at which resolution and over which ranges.
///
/// Limits always satisfy `start <= end`; the setters reject anything else and
/// leave the previous limits in place.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    axis1: Axis,
    axis2: Option<Axis>,
    bins: Bins,
    same_scale: bool,
    axis1_limits: Option<(f64, f64)>,
    axis2_limits: Option<(f64, f64)>,
    plot_options: PlotOptions,
}

impl View {
    pub fn new(axis1: Axis) -> Self {
        Self {
            axis1,
            axis2: None,
            bins: Bins::default(),
            same_scale: true,
            axis1_limits: None,
            axis2_limits: None,
            plot_options: PlotOptions::default(),
        }
    }

    pub fn with_plot_options(mut self, plot_options: PlotOptions) -> Self {
        self.plot_options = plot_options;
        self
    }

    pub fn with_axis2(mut self, axis2: Axis) -> Self {
        self.axis2 = Some(axis2);
        self
    }

    pub fn with_bins(mut self, bins: impl Into<Bins>) -> Self {
        self.bins = bins.into();
        self
    }

    pub fn with_same_scale(mut self, same_scale: bool) -> Self {
        self.same_scale = same_scale;
        self
    }

    pub fn axis1(&self) -> Axis {
        self.axis1
    }

    pub fn axis2(&self) -> Option<Axis> {
        self.axis2
    }

    pub fn bins(&self) -> Bins {
        self.bins
    }

    pub fn same_scale(&self) -> bool {
        self.same_scale
    }

    pub fn axis1_limits(&self) -> Option<(f64, f64)> {
        self.axis1_limits
    }

    pub fn axis2_limits(&self) -> Option<(f64, f64)> {
        self.axis2_limits
    }

    pub fn plot_options(&self) -> PlotOptions {
        self.plot_options
    }

    pub fn set_plot_options(&mut self, plot_options: PlotOptions) {
        self.plot_options = plot_options;
    }

    pub fn is_two_dimensional(&self) -> bool {
        self.axis2.is_some()
    }

    pub fn set_axis1_limits(&mut self, start: f64, end: f64) -> Result<(), ViewError> {
        self.axis1_limits = Some(checked_range(start, end)?);
        Ok(())
    }

    pub fn set_axis2_limits(&mut self, start: f64, end: f64) -> Result<(), ViewError> {
        self.axis2_limits = Some(checked_range(start, end)?);
        Ok(())
    }

    pub fn clear_limits(&mut self) {
        self.axis1_limits = None;
        self.axis2_limits = None;
    }
}

fn checked_range(start: f64, end: f64) -> Result<(f64, f64), ViewError> {
    // NaN fails the comparison too.
    if start <= end {
        Ok((start, end))
    } else {
        Err(ViewError::InvalidRange { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_view_has_defaults_and_no_limits() {
        let view = View::new(Axis::X);
        assert_eq!(view.axis1(), Axis::X);
        assert_eq!(view.axis2(), None);
        assert_eq!(view.bins(), Bins::Single(100));
        assert!(view.same_scale());
        assert_eq!(view.axis1_limits(), None);
        assert_eq!(view.axis2_limits(), None);
    }

    #[test]
    fn ordered_limits_are_stored_exactly() {
        let mut view = View::new(Axis::X).with_axis2(Axis::Y);
        for (start, end) in [(-1.0, 1.0), (0.5, 0.5), (f64::NEG_INFINITY, 3.0)] {
            view.set_axis1_limits(start, end).expect("ordered range");
            view.set_axis2_limits(start, end).expect("ordered range");
            assert_eq!(view.axis1_limits(), Some((start, end)));
            assert_eq!(view.axis2_limits(), Some((start, end)));
        }
    }

    #[test]
    fn reversed_limits_fail_and_keep_previous_values() {
        let mut view = View::new(Axis::L).with_axis2(Axis::T);
        view.set_axis1_limits(1.0, 2.0).expect("valid");
        view.set_axis2_limits(3.0, 4.0).expect("valid");

        assert_eq!(
            view.set_axis1_limits(5.0, -5.0),
            Err(ViewError::InvalidRange {
                start: 5.0,
                end: -5.0
            })
        );
        assert!(view.set_axis2_limits(4.0 + 1e-12, 4.0).is_err());

        assert_eq!(view.axis1_limits(), Some((1.0, 2.0)));
        assert_eq!(view.axis2_limits(), Some((3.0, 4.0)));
    }

    #[test]
    fn nan_limits_are_rejected() {
        let mut view = View::new(Axis::E);
        assert!(view.set_axis1_limits(f64::NAN, 1.0).is_err());
        assert!(view.set_axis1_limits(0.0, f64::NAN).is_err());
        assert_eq!(view.axis1_limits(), None);
    }

    #[test]
    fn clear_limits_resets_both_axes() {
        let mut view = View::new(Axis::X).with_axis2(Axis::Y);
        view.clear_limits();
        assert_eq!((view.axis1_limits(), view.axis2_limits()), (None, None));

        view.set_axis1_limits(0.0, 1.0).expect("valid");
        view.set_axis2_limits(0.0, 1.0).expect("valid");
        view.clear_limits();
        assert_eq!((view.axis1_limits(), view.axis2_limits()), (None, None));
    }

    #[test]
    fn pair_bins_apply_per_axis() {
        let bins = Bins::from((20, 40));
        assert_eq!(bins.for_axis(0), 20);
        assert_eq!(bins.for_axis(1), 40);
        assert_eq!(Bins::from(7).for_axis(1), 7);
    }

    #[test]
    fn plot_options_override_global_settings() {
        let view = View::new(Axis::X);
        assert_eq!(view.plot_options(), PlotOptions::default());
        assert_eq!(view.plot_options().resolve(true, 3.0), (true, 3.0));

        let options = PlotOptions {
            log_scale: Some(false),
            orders_of_magnitude: Some(8.0),
            colormap: Colormap::Grey,
        };
        let mut view = view.with_plot_options(options);
        view.set_axis1_limits(0.0, 1.0).expect("valid");
        view.clear_limits();
        assert_eq!(view.plot_options(), options);
        assert_eq!(view.plot_options().resolve(true, 3.0), (false, 8.0));
    }
}
