//! Per-ray event data recorded by list monitors, and the physical quantities derived from it.

use std::fmt;
use std::str::FromStr;

use crate::view::ViewError;

/// Speed [m/s] to wavelength [Å]: λ = K / v.
pub const SPEED_TO_WAVELENGTH: f64 = 3956.0346;

/// Speed squared [m²/s²] to energy [meV]: E = K · v².
pub const SPEED_SQUARED_TO_ENERGY: f64 = 5.227_037_25e-6;

/// One recorded ray: statistical weight, position [m], velocity [m/s] and time [s].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ray {
    pub p: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub t: f64,
}

impl Ray {
    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy + self.vz * self.vz).sqrt()
    }

    /// Value of `axis` for this ray.
    pub fn quantity(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::Vx => self.vx,
            Axis::Vy => self.vy,
            Axis::Vz => self.vz,
            Axis::Speed => self.speed(),
            Axis::Dx => self.vx.atan2(self.vz).to_degrees(),
            Axis::Dy => self.vy.atan2(self.vz).to_degrees(),
            Axis::T => self.t,
            Axis::L => SPEED_TO_WAVELENGTH / self.speed(),
            Axis::E => {
                let speed = self.speed();
                SPEED_SQUARED_TO_ENERGY * speed * speed
            }
        }
    }
}

/// Physical quantity a histogram axis can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    Vx,
    Vy,
    Vz,
    Speed,
    Dx,
    Dy,
    T,
    L,
    E,
}

impl Axis {
    pub const ALL: [Axis; 12] = [
        Axis::X,
        Axis::Y,
        Axis::Z,
        Axis::Vx,
        Axis::Vy,
        Axis::Vz,
        Axis::Speed,
        Axis::Dx,
        Axis::Dy,
        Axis::T,
        Axis::L,
        Axis::E,
    ];

    /// Short specifier used in views and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Vx => "vx",
            Axis::Vy => "vy",
            Axis::Vz => "vz",
            Axis::Speed => "speed",
            Axis::Dx => "dx",
            Axis::Dy => "dy",
            Axis::T => "t",
            Axis::L => "l",
            Axis::E => "e",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x position [m]",
            Axis::Y => "y position [m]",
            Axis::Z => "z position [m]",
            Axis::Vx => "x velocity [m/s]",
            Axis::Vy => "y velocity [m/s]",
            Axis::Vz => "z velocity [m/s]",
            Axis::Speed => "speed [m/s]",
            Axis::Dx => "divergence x [deg]",
            Axis::Dy => "divergence y [deg]",
            Axis::T => "time [s]",
            Axis::L => "wavelength [AA]",
            Axis::E => "energy [meV]",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Axis {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Axis::ALL
            .into_iter()
            .find(|axis| axis.key() == s)
            .ok_or_else(|| ViewError::UnknownAxis(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData {
    pub rays: Vec<Ray>,
}

impl EventData {
    pub fn new(rays: Vec<Ray>) -> Self {
        Self { rays }
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    pub fn quantity(&self, axis: Axis) -> Vec<f64> {
        self.rays.iter().map(|ray| ray.quantity(axis)).collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.rays.iter().map(|ray| ray.p).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray_along_z(speed: f64) -> Ray {
        Ray {
            p: 1.0,
            vz: speed,
            ..Default::default()
        }
    }

    #[test]
    fn wavelength_and_energy_follow_speed() {
        let ray = ray_along_z(SPEED_TO_WAVELENGTH / 4.0);
        assert!((ray.quantity(Axis::L) - 4.0).abs() < 1e-9);
        // 4 AA neutrons carry about 5.11 meV.
        assert!((ray.quantity(Axis::E) - 5.113).abs() < 1e-2);
    }

    #[test]
    fn divergence_is_measured_from_beam_axis_in_degrees() {
        let ray = Ray {
            p: 1.0,
            vx: 10.0,
            vy: -10.0,
            vz: 10.0,
            ..Default::default()
        };
        assert!((ray.quantity(Axis::Dx) - 45.0).abs() < 1e-9);
        assert!((ray.quantity(Axis::Dy) + 45.0).abs() < 1e-9);
    }

    #[test]
    fn axis_keys_round_trip_and_reject_unknown() {
        for axis in Axis::ALL {
            assert_eq!(axis.key().parse::<Axis>().expect("known key"), axis);
        }
        assert!(matches!(
            "lambda".parse::<Axis>(),
            Err(ViewError::UnknownAxis(name)) if name == "lambda"
        ));
    }
}
