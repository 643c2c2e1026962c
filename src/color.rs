use std::collections::BTreeMap;
use std::fmt;

use eframe::egui::Color32;
use ndarray::{Array2, ArrayView2};
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Discrete palette (one colour per source)
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

/// Maps source names to distinct colours.
#[derive(Debug, Clone)]
pub struct SourceColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl SourceColors {
    pub fn new(sources: &[String]) -> Self {
        let mapping = sources
            .iter()
            .cloned()
            .zip(generate_palette(sources.len()))
            .collect();
        SourceColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, source: &str) -> Color32 {
        self.mapping
            .get(source)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Continuous colour maps for diagram heatmaps
// ---------------------------------------------------------------------------

/// Perceptual colour map used for heatmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMap {
    Viridis,
    Greys,
}

impl ColorMap {
    pub const ALL: [ColorMap; 2] = [ColorMap::Viridis, ColorMap::Greys];

    fn anchors(self) -> &'static [(u8, u8, u8)] {
        match self {
            ColorMap::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
            ColorMap::Greys => &[(255, 255, 255), (0, 0, 0)],
        }
    }

    /// Colour at `t` in `[0, 1]`, interpolated in linear RGB.
    pub fn at(self, t: f64) -> Color32 {
        let anchors = self.anchors();
        let t = (if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }) as f32;
        let segments = (anchors.len() - 1) as f32;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(anchors.len() - 2);
        let frac = pos - i as f32;

        let a = linear(anchors[i]);
        let b = linear(anchors[i + 1]);
        to_color32(Srgb::from_linear(a.mix(b, frac)))
    }
}

impl fmt::Display for ColorMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorMap::Viridis => write!(f, "viridis"),
            ColorMap::Greys => write!(f, "greys"),
        }
    }
}

/// How grid values are mapped onto the colour map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    Linear,
    Log10,
}

impl fmt::Display for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorScale::Linear => write!(f, "linear"),
            ColorScale::Log10 => write!(f, "log10"),
        }
    }
}

/// Rescale a grid to `[0, 1]`. Empty (non-positive) cells become `None`.
///
/// In log mode the range covers the smallest and largest positive values.
pub fn normalise_grid(grid: ArrayView2<'_, f64>, scale: ColorScale) -> Array2<Option<f64>> {
    let transform = |v: f64| match scale {
        ColorScale::Linear => v,
        ColorScale::Log10 => v.log10(),
    };
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for &v in grid.iter().filter(|v| **v > 0.0) {
        let tv = transform(v);
        lo = lo.min(tv);
        hi = hi.max(tv);
    }
    if scale == ColorScale::Linear {
        lo = 0.0;
    }
    let span = hi - lo;

    grid.mapv(|v| {
        if v > 0.0 {
            if span > 0.0 {
                Some((transform(v) - lo) / span)
            } else {
                Some(1.0)
            }
        } else {
            None
        }
    })
}

fn linear((r, g, b): (u8, u8, u8)) -> LinSrgb {
    Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0).into_linear()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgb(c(rgb.red), c(rgb.green), c(rgb.blue))
}
