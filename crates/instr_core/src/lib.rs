//! Core model for configuring ray-tracing instrument runs and histogramming their results.
//!
//! # Quick Start
//!
//! ```no_run
//! use instr_core::instrument::{Instrument, ParameterVariable};
//! use instr_core::run::{InstrumentRunner, RunRequest};
//! use instr_core::synthetic::SyntheticRunner;
//! use instr_core::view::View;
//! use instr_core::histogram::histogram;
//!
//! let mut instrument = Instrument::new("guide_test");
//! instrument
//!     .add_parameter(ParameterVariable::new("wavelength").with_default(5.0))
//!     .unwrap();
//!
//! let request = RunRequest::new(instrument.default_parameters(), 100_000);
//! let data = SyntheticRunner::default()
//!     .run_full_instrument(&instrument, &request)
//!     .unwrap();
//!
//! let view = View::new("l".parse().unwrap());
//! let events = data.event_monitors().next().unwrap().1;
//! let hist = histogram(events, &view).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`instrument`]: instrument descriptor and parameter variables
//! - [`run`]: run requests, run-setting parsers and the [`run::InstrumentRunner`] seam
//! - [`mcrun`]: process executor for an external `mcrun`-compatible binary
//! - [`synthetic`]: built-in source/detector ray generator
//! - [`loader`]: McCode text output folder loader
//! - [`dataset`]: monitor data returned by a run
//! - [`events`]: per-ray event data and derived quantities
//! - [`view`]: histogram view descriptor
//! - [`histogram`]: 1D/2D histograms of event data
//! - [`export`]: CSV and Parquet writers

pub mod dataset;
pub mod events;
pub mod export;
pub mod histogram;
pub mod instrument;
pub mod loader;
pub mod mcrun;
pub mod run;
pub mod synthetic;
pub mod view;
