mod support;

use instr_core::dataset::MonitorValues;
use instr_core::events::Axis;
use instr_core::histogram::{histogram, histogram_views, Histogram};
use instr_core::instrument::{Instrument, ParameterValue};
use instr_core::run::{parse_ncount, InstrumentRunner, MpiSetting, RunError, RunRequest};
use instr_core::synthetic::{SyntheticRunner, EVENT_MONITOR};
use instr_core::view::View;

use support::{synthetic_instrument, INSTRUMENT_JSON};

#[test]
fn instrument_descriptor_loads_from_file_with_relative_source() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("guide_test.json");
    std::fs::write(&path, INSTRUMENT_JSON).expect("write");

    let instrument = Instrument::from_json_file(&path).expect("descriptor loads");
    assert_eq!(instrument.name, "guide_test");
    assert_eq!(
        instrument.source.as_deref(),
        Some(dir.path().join("guide_test.instr").as_path())
    );
    let defaults = instrument.default_parameters();
    assert_eq!(defaults.get("wavelength"), Some(&ParameterValue::Int(5)));
    assert_eq!(defaults.get("seed"), Some(&ParameterValue::Int(11)));
    assert!(!defaults.contains_key("guide_coating"));
}

#[test]
fn synthetic_run_feeds_histograms() {
    let instrument = synthetic_instrument();
    let ncount = parse_ncount("2e4").expect("ncount");
    let request = RunRequest::new(instrument.default_parameters(), ncount)
        .with_mpi("2".parse::<MpiSetting>().expect("mpi"));

    let data = SyntheticRunner
        .run_full_instrument(&instrument, &request)
        .expect("run");
    let events = match &data.monitor(EVENT_MONITOR).expect("events").values {
        MonitorValues::Events(events) => events,
        other => panic!("unexpected monitor values {other:?}"),
    };

    let mut view = View::new(Axis::L).with_axis2(Axis::Dx).with_bins((40, 20));
    view.set_axis1_limits(4.4, 5.6).expect("limits");
    let Histogram::TwoD(hist) = histogram(events, &view).expect("histogram") else {
        panic!("expected a 2D histogram");
    };
    assert_eq!(hist.intensity.len(), 40 * 20);
    assert!((hist.intensity.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    assert_eq!(hist.events.iter().sum::<u64>(), ncount);
}

#[test]
fn shared_scale_covers_every_run() {
    let instrument = synthetic_instrument();
    let narrow = RunRequest::new(instrument.default_parameters(), 2_000);
    let mut parameters = instrument.default_parameters();
    parameters.insert("wavelength".to_string(), ParameterValue::Float(8.0));
    let wide = RunRequest::new(parameters, 2_000);

    let first = SyntheticRunner.run_full_instrument(&instrument, &narrow).expect("run");
    let second = SyntheticRunner.run_full_instrument(&instrument, &wide).expect("run");
    let sets = [
        first.event_monitors().next().expect("events").1,
        second.event_monitors().next().expect("events").1,
    ];

    let view = View::new(Axis::L).with_bins(50);
    let hists = histogram_views(&sets, &view).expect("histograms");
    let ranges: Vec<(f64, f64)> = hists
        .iter()
        .map(|hist| match hist {
            Histogram::OneD(hist) => (hist.binning.start, hist.binning.end),
            Histogram::TwoD(_) => panic!("expected 1D"),
        })
        .collect();
    assert_eq!(ranges[0], ranges[1]);
    assert!(ranges[0].0 < 5.0 && ranges[0].1 > 8.0);
    for hist in &hists {
        assert!((hist.total_intensity() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn request_for_undeclared_parameter_is_rejected() {
    let instrument = synthetic_instrument();
    let mut parameters = instrument.default_parameters();
    parameters.insert("guide_coating".to_string(), ParameterValue::from("m=2"));
    let request = RunRequest::new(parameters, 100);
    assert!(matches!(
        SyntheticRunner.run_full_instrument(&instrument, &request),
        Err(RunError::UnknownParameter(name)) if name == "guide_coating"
    ));
}
