//! Built-in ray generator: a rectangular source with a wavelength band,
//! observed by a flat detector at a fixed distance.
//!
//! Rays are produced in fixed-size chunks, each with its own RNG seeded from
//! the run seed and the chunk index. The worker pool only decides how chunks
//! are scheduled, so the rays are identical for any `mpi` setting.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::dataset::{Dataset, MonitorData, MonitorMetadata, MonitorValues};
use crate::events::{Axis, EventData, Ray, SPEED_TO_WAVELENGTH};
use crate::histogram::{histogram, Histogram};
use crate::instrument::{Instrument, ParameterType, ParameterVariable};
use crate::run::{check_parameters, InstrumentRunner, RunError, RunRequest};
use crate::view::{Bins, View};

pub const EVENT_MONITOR: &str = "events";
pub const WAVELENGTH_MONITOR: &str = "l_monitor";
pub const POSITION_MONITOR: &str = "psd_monitor";

const CHUNK_SIZE: u64 = 10_000;

/// Largest run the synthetic runner accepts. Every ray is held in memory
/// (64 bytes each), so this caps a run near 3.2 GB.
pub const MAX_SYNTHETIC_NCOUNT: u64 = 50_000_000;

const MONITOR_BINS: usize = 100;

/// Source and detector geometry for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSettings {
    /// Centre wavelength [Å].
    pub wavelength: f64,
    /// Half width of the wavelength band [Å].
    pub d_wavelength: f64,
    /// [m]
    pub source_width: f64,
    /// [m]
    pub source_height: f64,
    /// Full divergence in both directions [deg].
    pub divergence: f64,
    /// Source to detector [m].
    pub distance: f64,
    pub seed: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            wavelength: 5.0,
            d_wavelength: 1.0,
            source_width: 0.02,
            source_height: 0.02,
            divergence: 1.0,
            distance: 10.0,
            seed: 0,
        }
    }
}

impl SourceSettings {
    /// Read settings from a request, falling back to instrument defaults and then to built-in values.
    pub fn from_request(instrument: &Instrument, request: &RunRequest) -> Result<Self, RunError> {
        let defaults = Self::default();
        let read = |name: &str, fallback: f64| -> Result<f64, RunError> {
            let value = request
                .parameters
                .get(name)
                .or_else(|| instrument.parameter(name).and_then(|p| p.default_value()));
            match value {
                None => Ok(fallback),
                Some(value) => value
                    .as_f64()
                    .filter(|number| number.is_finite())
                    .ok_or_else(|| RunError::InvalidParameter {
                        name: name.to_string(),
                        value: value.to_string(),
                    }),
            }
        };

        let settings = Self {
            wavelength: read("wavelength", defaults.wavelength)?,
            d_wavelength: read("d_wavelength", defaults.d_wavelength)?,
            source_width: read("source_width", defaults.source_width)?,
            source_height: read("source_height", defaults.source_height)?,
            divergence: read("divergence", defaults.divergence)?,
            distance: read("distance", defaults.distance)?,
            seed: read("seed", defaults.seed as f64)? as u64,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), RunError> {
        let invalid = |name: &str, value: f64| RunError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        };
        if self.wavelength - self.d_wavelength <= 0.0 {
            return Err(invalid("wavelength", self.wavelength));
        }
        if self.d_wavelength < 0.0 {
            return Err(invalid("d_wavelength", self.d_wavelength));
        }
        if self.source_width < 0.0 {
            return Err(invalid("source_width", self.source_width));
        }
        if self.source_height < 0.0 {
            return Err(invalid("source_height", self.source_height));
        }
        if !(0.0..180.0).contains(&self.divergence) {
            return Err(invalid("divergence", self.divergence));
        }
        if self.distance <= 0.0 {
            return Err(invalid("distance", self.distance));
        }
        Ok(())
    }
}

/// Instrument declaring every parameter the synthetic runner reads, with its built-in default.
pub fn demo_instrument() -> Instrument {
    let defaults = SourceSettings::default();
    let parameters = [
        ("wavelength", defaults.wavelength, "Centre wavelength [AA]"),
        ("d_wavelength", defaults.d_wavelength, "Half width of the wavelength band [AA]"),
        ("source_width", defaults.source_width, "Source width [m]"),
        ("source_height", defaults.source_height, "Source height [m]"),
        ("divergence", defaults.divergence, "Full divergence [deg]"),
        ("distance", defaults.distance, "Source to detector distance [m]"),
    ];

    let mut instrument = Instrument::new("synthetic_source");
    instrument.parameter_list = parameters
        .into_iter()
        .map(|(name, default, comment)| {
            ParameterVariable::new(name)
                .with_default(default)
                .with_comment(comment)
        })
        .collect();
    instrument.parameter_list.push(
        ParameterVariable::new("seed")
            .with_kind(ParameterType::Int)
            .with_default(defaults.seed as i64)
            .with_comment("Random seed"),
    );
    instrument
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticRunner;

impl SyntheticRunner {
    pub fn new() -> Self {
        Self
    }
}

impl InstrumentRunner for SyntheticRunner {
    fn run_full_instrument(
        &self,
        instrument: &Instrument,
        request: &RunRequest,
    ) -> Result<Dataset, RunError> {
        check_parameters(instrument, request)?;
        if request.ncount == 0 || request.ncount > MAX_SYNTHETIC_NCOUNT {
            return Err(RunError::InvalidParameter {
                name: "ncount".to_string(),
                value: request.ncount.to_string(),
            });
        }
        let settings = SourceSettings::from_request(instrument, request)?;
        let workers = worker_count(request.mpi);

        info!(
            "Generating {} rays for {} on {} workers",
            request.ncount, instrument.name, workers
        );
        let events = generate_events(&settings, request.ncount, workers)?;
        debug!("Generated {} rays", events.len());

        let wavelength_view = View::new(Axis::L).with_bins(MONITOR_BINS);
        let position_view = View::new(Axis::X)
            .with_axis2(Axis::Y)
            .with_bins(Bins::Single(MONITOR_BINS));

        let wavelength = monitor_from_histogram(
            WAVELENGTH_MONITOR,
            "Wavelength monitor",
            histogram(&events, &wavelength_view)?,
        );
        let position = monitor_from_histogram(
            POSITION_MONITOR,
            "Position sensitive detector",
            histogram(&events, &position_view)?,
        );
        let events = MonitorData {
            name: EVENT_MONITOR.to_string(),
            metadata: MonitorMetadata {
                component: EVENT_MONITOR.to_string(),
                title: "Detector events".to_string(),
                ..Default::default()
            },
            values: MonitorValues::Events(events),
        };

        Ok(Dataset::new(vec![events, wavelength, position]))
    }
}

/// Threads for an `mpi` setting: at least one, at most the available parallelism.
pub fn worker_count(mpi: Option<u32>) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (mpi.unwrap_or(1) as usize).clamp(1, available)
}

/// Generate `ncount` rays on a pool of `workers` threads.
pub fn generate_events(
    settings: &SourceSettings,
    ncount: u64,
    workers: usize,
) -> Result<EventData, RunError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|error| RunError::Pool(error.to_string()))?;

    let chunks = ncount.div_ceil(CHUNK_SIZE) as usize;
    let weight = 1.0 / ncount as f64;
    let rays: Vec<Vec<Ray>> = pool.install(|| {
        (0..chunks)
            .into_par_iter()
            .map(|chunk| {
                let chunk = chunk as u64;
                let size = CHUNK_SIZE.min(ncount - chunk * CHUNK_SIZE);
                generate_chunk(settings, chunk, size, weight)
            })
            .collect()
    });

    Ok(EventData::new(rays.into_iter().flatten().collect()))
}

fn generate_chunk(settings: &SourceSettings, chunk: u64, size: u64, weight: f64) -> Vec<Ray> {
    let mut rng = StdRng::seed_from_u64(settings.seed.wrapping_add(chunk));
    let half_divergence = (settings.divergence / 2.0).to_radians();

    (0..size)
        .map(|_| {
            let x0 = symmetric(&mut rng, settings.source_width / 2.0);
            let y0 = symmetric(&mut rng, settings.source_height / 2.0);
            let wavelength = settings.wavelength + symmetric(&mut rng, settings.d_wavelength);
            let tan_x = symmetric(&mut rng, half_divergence).tan();
            let tan_y = symmetric(&mut rng, half_divergence).tan();

            let speed = SPEED_TO_WAVELENGTH / wavelength;
            let vz = speed / (1.0 + tan_x * tan_x + tan_y * tan_y).sqrt();
            let vx = vz * tan_x;
            let vy = vz * tan_y;
            let t = settings.distance / vz;

            Ray {
                p: weight,
                x: x0 + vx * t,
                y: y0 + vy * t,
                z: settings.distance,
                vx,
                vy,
                vz,
                t,
            }
        })
        .collect()
}

/// Uniform on `[-half, half]`.
fn symmetric(rng: &mut StdRng, half: f64) -> f64 {
    if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

fn monitor_from_histogram(name: &str, title: &str, hist: Histogram) -> MonitorData {
    let (values, xlabel, ylabel) = match hist {
        Histogram::OneD(hist) => (
            MonitorValues::OneD {
                x: hist.binning.centers(),
                intensity: hist.intensity,
                error: hist.error,
                events: hist.events.into_iter().map(|count| count as f64).collect(),
            },
            hist.binning.axis.label().to_string(),
            "Intensity".to_string(),
        ),
        Histogram::TwoD(hist) => (
            MonitorValues::TwoD {
                nx: hist.x.bins,
                ny: hist.y.bins,
                limits: [hist.x.start, hist.x.end, hist.y.start, hist.y.end],
                intensity: hist.intensity,
                error: hist.error,
                events: hist.events.into_iter().map(|count| count as f64).collect(),
            },
            hist.x.axis.label().to_string(),
            hist.y.axis.label().to_string(),
        ),
    };

    MonitorData {
        name: name.to_string(),
        metadata: MonitorMetadata {
            component: name.to_string(),
            title: title.to_string(),
            xlabel,
            ylabel,
            ..Default::default()
        },
        values,
    }
}
