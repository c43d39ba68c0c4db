//! Weighted 1D/2D histograms of event data, as described by a [`View`].

use rayon::prelude::*;
use thiserror::Error;

use crate::events::{Axis, EventData, Ray};
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistogramError {
    #[error("view on '{0}' asks for zero bins")]
    ZeroBins(Axis),
    #[error("no finite '{0}' values to derive a range from; set limits on the view")]
    NoRange(Axis),
    #[error("{x_bins} x {y_bins} bins do not fit in memory")]
    TooManyBins { x_bins: usize, y_bins: usize },
}

/// Uniform binning of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBinning {
    pub axis: Axis,
    pub start: f64,
    pub end: f64,
    pub bins: usize,
}

impl AxisBinning {
    pub fn width(&self) -> f64 {
        (self.end - self.start) / self.bins as f64
    }

    pub fn edges(&self) -> Vec<f64> {
        let width = self.width();
        (0..=self.bins)
            .map(|i| self.start + width * i as f64)
            .collect()
    }

    pub fn centers(&self) -> Vec<f64> {
        let width = self.width();
        (0..self.bins)
            .map(|i| self.start + width * (i as f64 + 0.5))
            .collect()
    }

    /// Bin holding `value`. The upper edge belongs to the last bin.
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if !(value >= self.start && value <= self.end) {
            return None;
        }
        if value == self.end {
            return Some(self.bins - 1);
        }
        let index = ((value - self.start) / self.width()) as usize;
        Some(index.min(self.bins - 1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    pub binning: AxisBinning,
    pub intensity: Vec<f64>,
    pub error: Vec<f64>,
    pub events: Vec<u64>,
}

/// Row-major: index is `iy * nx + ix`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    pub x: AxisBinning,
    pub y: AxisBinning,
    pub intensity: Vec<f64>,
    pub error: Vec<f64>,
    pub events: Vec<u64>,
}

impl Histogram2D {
    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.intensity[iy * self.x.bins + ix]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Histogram {
    OneD(Histogram1D),
    TwoD(Histogram2D),
}

impl Histogram {
    pub fn total_intensity(&self) -> f64 {
        match self {
            Histogram::OneD(hist) => hist.intensity.iter().sum(),
            Histogram::TwoD(hist) => hist.intensity.iter().sum(),
        }
    }

    pub fn total_events(&self) -> u64 {
        match self {
            Histogram::OneD(hist) => hist.events.iter().sum(),
            Histogram::TwoD(hist) => hist.events.iter().sum(),
        }
    }
}

/// Min..max of the finite values. Degenerate ranges are widened so they hold one bin.
pub fn auto_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });
    if min > max {
        return None;
    }
    if min == max {
        let pad = if min == 0.0 { 0.5 } else { min.abs() * 0.01 };
        return Some((min - pad, max + pad));
    }
    Some((min, max))
}

fn union(left: Option<(f64, f64)>, right: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (left, right) {
        (Some((a0, a1)), Some((b0, b1))) => Some((a0.min(b0), a1.max(b1))),
        (Some(range), None) | (None, Some(range)) => Some(range),
        (None, None) => None,
    }
}

fn range_of(events: &EventData, axis: Axis) -> Option<(f64, f64)> {
    auto_range(events.rays.iter().map(|ray| ray.quantity(axis)))
}

fn binning(
    axis: Axis,
    limits: Option<(f64, f64)>,
    auto: Option<(f64, f64)>,
    bins: usize,
) -> Result<AxisBinning, HistogramError> {
    if bins == 0 {
        return Err(HistogramError::ZeroBins(axis));
    }
    let (start, end) = limits
        .or(auto)
        .ok_or(HistogramError::NoRange(axis))?;
    // Explicit limits may be equal; give the bin some width.
    let (start, end) = if start == end {
        auto_range([start]).unwrap_or((start, end))
    } else {
        (start, end)
    };
    Ok(AxisBinning {
        axis,
        start,
        end,
        bins,
    })
}

/// Histogram `events` on the axes of `view`.
pub fn histogram(events: &EventData, view: &View) -> Result<Histogram, HistogramError> {
    let auto1 = match view.axis1_limits() {
        Some(_) => None,
        None => range_of(events, view.axis1()),
    };
    let auto2 = match (view.axis2(), view.axis2_limits()) {
        (Some(axis2), None) => range_of(events, axis2),
        _ => None,
    };
    histogram_with_ranges(events, view, auto1, auto2)
}

/// Histogram one view over several event sets.
///
/// With `same_scale`, axes without explicit limits share the union of the
/// automatic ranges of every set.
pub fn histogram_views(
    datasets: &[&EventData],
    view: &View,
) -> Result<Vec<Histogram>, HistogramError> {
    if !view.same_scale() {
        return datasets
            .iter()
            .map(|events| histogram(events, view))
            .collect();
    }

    let shared1 = match view.axis1_limits() {
        Some(_) => None,
        None => datasets
            .iter()
            .map(|events| range_of(events, view.axis1()))
            .fold(None, union),
    };
    let shared2 = match (view.axis2(), view.axis2_limits()) {
        (Some(axis2), None) => datasets
            .iter()
            .map(|events| range_of(events, axis2))
            .fold(None, union),
        _ => None,
    };

    datasets
        .iter()
        .map(|events| histogram_with_ranges(events, view, shared1, shared2))
        .collect()
}

fn histogram_with_ranges(
    events: &EventData,
    view: &View,
    auto1: Option<(f64, f64)>,
    auto2: Option<(f64, f64)>,
) -> Result<Histogram, HistogramError> {
    let x = binning(
        view.axis1(),
        view.axis1_limits(),
        auto1,
        view.bins().for_axis(0),
    )?;

    let Some(axis2) = view.axis2() else {
        let (intensity, error, events) =
            fill(&events.rays, x.bins, |ray| x.index_of(ray.quantity(x.axis))).into_parts();
        return Ok(Histogram::OneD(Histogram1D {
            binning: x,
            intensity,
            error,
            events,
        }));
    };

    let y = binning(axis2, view.axis2_limits(), auto2, view.bins().for_axis(1))?;
    let cells = x
        .bins
        .checked_mul(y.bins)
        .ok_or(HistogramError::TooManyBins {
            x_bins: x.bins,
            y_bins: y.bins,
        })?;
    let (intensity, error, events) = fill(&events.rays, cells, |ray| {
        let ix = x.index_of(ray.quantity(x.axis))?;
        let iy = y.index_of(ray.quantity(y.axis))?;
        Some(iy * x.bins + ix)
    })
    .into_parts();
    Ok(Histogram::TwoD(Histogram2D {
        x,
        y,
        intensity,
        error,
        events,
    }))
}

#[derive(Debug, Clone)]
struct Accumulator {
    intensity: Vec<f64>,
    weight_squared: Vec<f64>,
    events: Vec<u64>,
}

impl Accumulator {
    fn new(len: usize) -> Self {
        Self {
            intensity: vec![0.0; len],
            weight_squared: vec![0.0; len],
            events: vec![0; len],
        }
    }

    fn add(&mut self, index: usize, weight: f64) {
        self.intensity[index] += weight;
        self.weight_squared[index] += weight * weight;
        self.events[index] += 1;
    }

    fn merge(mut self, other: Self) -> Self {
        for i in 0..self.intensity.len() {
            self.intensity[i] += other.intensity[i];
            self.weight_squared[i] += other.weight_squared[i];
            self.events[i] += other.events[i];
        }
        self
    }

    /// Intensity, error (root of summed squared weights) and event counts.
    fn into_parts(self) -> (Vec<f64>, Vec<f64>, Vec<u64>) {
        let error = self.weight_squared.iter().map(|w2| w2.sqrt()).collect();
        (self.intensity, error, self.events)
    }
}

fn fill<F>(rays: &[Ray], len: usize, index_of: F) -> Accumulator
where
    F: Fn(&Ray) -> Option<usize> + Sync,
{
    rays.par_iter()
        .fold(
            || Accumulator::new(len),
            |mut acc, ray| {
                if let Some(index) = index_of(ray) {
                    acc.add(index, ray.p);
                }
                acc
            },
        )
        .reduce(|| Accumulator::new(len), Accumulator::merge)
}
