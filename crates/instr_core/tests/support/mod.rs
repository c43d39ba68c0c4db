#![allow(dead_code)]

use instr_core::events::{EventData, Ray};
use instr_core::instrument::Instrument;

pub const INSTRUMENT_JSON: &str = r#"{
    "name": "guide_test",
    "source": "guide_test.instr",
    "parameters": [
        {"name": "wavelength", "comment": "Centre wavelength [AA]", "type": "double", "default": 5},
        {"name": "d_wavelength", "type": "double", "default": 0.5},
        {"name": "seed", "type": "int", "default": 11},
        {"name": "guide_coating", "type": "string"}
    ]
}"#;

pub fn synthetic_instrument() -> Instrument {
    let mut instrument = Instrument::from_json_str(INSTRUMENT_JSON).expect("fixture parses");
    instrument.parameter_list.retain(|p| p.name != "guide_coating");
    instrument
}

/// Rays moving straight along z with the given speeds and unit weight.
pub fn rays_with_speeds(speeds: &[f64]) -> EventData {
    EventData::new(
        speeds
            .iter()
            .map(|&vz| Ray {
                p: 1.0,
                vz,
                ..Ray::default()
            })
            .collect(),
    )
}
