//! Colour mapping and number formatting for the plots.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::{Color32, ColorImage};

use instr_core::view::Colormap;

/// Viridis-like stops from low to high.
const COLORMAP_STOPS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Colour for `t` in `[0, 1]`; values outside are clamped.
pub fn colormap(t: f64) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (COLORMAP_STOPS.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(COLORMAP_STOPS.len() - 2);
    let frac = scaled - index as f64;
    let (r0, g0, b0) = COLORMAP_STOPS[index];
    let (r1, g1, b1) = COLORMAP_STOPS[index + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    Color32::from_rgb(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

pub fn colour_at(map: Colormap, t: f64) -> Color32 {
    match map {
        Colormap::Viridis => colormap(t),
        Colormap::Grey => {
            let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
            Color32::from_gray((t * 255.0).round() as u8)
        }
    }
}

/// Image of `nx` by `ny` normalized values stored row-major with `iy = 0` at the bottom.
///
/// Image rows run top to bottom, so the rows are flipped.
pub fn colour_map_image(map: Colormap, nx: usize, ny: usize, normalized: &[f64]) -> ColorImage {
    let mut rgba = Vec::with_capacity(nx * ny * 4);
    for iy in (0..ny).rev() {
        for ix in 0..nx {
            let value = normalized.get(iy * nx + ix).copied().unwrap_or(0.0);
            rgba.extend_from_slice(&colour_at(map, value).to_array());
        }
    }
    ColorImage::from_rgba_unmultiplied([nx, ny], &rgba)
}

pub fn values_hash(values: &[f64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    values.len().hash(&mut hasher);
    for value in values {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e4 || value.abs() < 1e-3 {
        format!("{value:.3e}")
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colormap_hits_end_stops_and_clamps() {
        assert_eq!(colormap(0.0), Color32::from_rgb(68, 1, 84));
        assert_eq!(colormap(1.0), Color32::from_rgb(253, 231, 37));
        assert_eq!(colormap(-3.0), colormap(0.0));
        assert_eq!(colormap(7.0), colormap(1.0));
        assert_eq!(colormap(f64::NAN), colormap(0.0));
    }

    #[test]
    fn image_puts_first_row_at_bottom() {
        // 2 x 2: bottom row low, top row high.
        let image = colour_map_image(Colormap::Viridis, 2, 2, &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(image.size, [2, 2]);
        assert_eq!(image.pixels[0], colormap(1.0));
        assert_eq!(image.pixels[3], colormap(0.0));
    }

    #[test]
    fn grey_map_runs_black_to_white() {
        assert_eq!(colour_at(Colormap::Grey, 0.0), Color32::from_gray(0));
        assert_eq!(colour_at(Colormap::Grey, 1.0), Color32::from_gray(255));
        let image = colour_map_image(Colormap::Grey, 1, 2, &[0.0, 1.0]);
        assert_eq!(image.pixels[0], Color32::from_gray(255));
    }

    #[test]
    fn hash_tracks_values() {
        assert_eq!(values_hash(&[1.0, 2.0]), values_hash(&[1.0, 2.0]));
        assert_ne!(values_hash(&[1.0, 2.0]), values_hash(&[2.0, 1.0]));
    }

    #[test]
    fn formats_small_and_large_values() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.5), "1.5000");
        assert_eq!(format_value(123456.0), "1.235e5");
    }
}
