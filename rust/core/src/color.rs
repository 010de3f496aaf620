// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color classifications, the display palette and date-bucket hue generation.

use std::collections::BTreeMap;
use std::fmt;

/// Golden ratio conjugate, the hue increment between successive date buckets.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618033988749895;

/// Saturation used for generated bucket colors.
pub const BUCKET_SATURATION: f64 = 0.7;

/// Lightness used for generated bucket colors.
pub const BUCKET_LIGHTNESS: f64 = 0.5;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// The display bucket an object should be in. Exactly one per object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "tag", content = "color"))]
pub enum Classification {
    White,
    Installed,
    Preassembly,
    /// Generated per-day or per-month color.
    Bucket(Rgb),
}

impl Classification {
    pub fn tag(&self) -> &'static str {
        match self {
            Classification::White => "white",
            Classification::Installed => "installed",
            Classification::Preassembly => "preassembly",
            Classification::Bucket(_) => "bucket",
        }
    }
}

/// Colors for the fixed classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Palette {
    pub white: Rgb,
    pub installed: Rgb,
    pub preassembly: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            white: Rgb::WHITE,
            installed: Rgb::new(34, 197, 94),
            preassembly: Rgb::new(147, 51, 234),
        }
    }
}

impl Palette {
    pub fn color_of(&self, classification: &Classification) -> Rgb {
        match classification {
            Classification::White => self.white,
            Classification::Installed => self.installed,
            Classification::Preassembly => self.preassembly,
            Classification::Bucket(rgb) => *rgb,
        }
    }
}

/// Convert HSL (all components in 0..=1) to 8-bit RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    if s <= 0.0 {
        let v = channel(l);
        return Rgb::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    Rgb::new(
        channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
        channel(hue_to_rgb(p, q, h)),
        channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[inline]
fn channel(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Hues for `n` successive buckets: 0, then +φ⁻¹ modulo 1.
pub fn golden_hues(n: usize) -> Vec<f64> {
    let mut hue = 0.0_f64;
    let mut hues = Vec::with_capacity(n);
    for _ in 0..n {
        hues.push(hue);
        hue = (hue + GOLDEN_RATIO_CONJUGATE) % 1.0;
    }
    hues
}

/// Assign a distinct color to each date key.
///
/// Keys are sorted and deduplicated first, so the result depends only on the
/// set of keys, not on their input order. Works for day (`YYYY-MM-DD`) and
/// month (`YYYY-MM`) keys alike.
pub fn generate_date_colors<S: AsRef<str>>(dates: &[S]) -> BTreeMap<String, Rgb> {
    let mut keys: Vec<&str> = dates.iter().map(|d| d.as_ref()).collect();
    keys.sort_unstable();
    keys.dedup();

    keys.iter()
        .zip(golden_hues(keys.len()))
        .map(|(key, hue)| {
            (
                key.to_string(),
                hsl_to_rgb(hue, BUCKET_SATURATION, BUCKET_LIGHTNESS),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(hsl_to_rgb(0.3, 0.0, 1.0), Rgb::WHITE);
    }

    #[test]
    fn date_colors_are_deterministic_and_order_independent() {
        let a = generate_date_colors(&["2024-01-01", "2024-01-02"]);
        let b = generate_date_colors(&["2024-01-02", "2024-01-01", "2024-01-02"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a["2024-01-01"], Rgb::new(217, 38, 38));
        assert_eq!(a["2024-01-02"], Rgb::new(38, 90, 217));
    }

    #[test]
    fn golden_hues_stay_apart() {
        let hues = golden_hues(20);
        let mut sorted = hues.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mut min_gap = 1.0 - sorted[sorted.len() - 1] + sorted[0];
        for pair in sorted.windows(2) {
            min_gap = min_gap.min(pair[1] - pair[0]);
        }
        assert!(min_gap > 0.03, "min gap {min_gap}");
    }

    #[test]
    fn palette_lookup() {
        let palette = Palette::default();
        assert_eq!(palette.color_of(&Classification::White), Rgb::WHITE);
        let bucket = Rgb::new(1, 2, 3);
        assert_eq!(palette.color_of(&Classification::Bucket(bucket)), bucket);
        assert_eq!(Rgb::new(34, 197, 94).to_hex(), "#22c55e");
    }
}
