use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Sequential colour scale
// ---------------------------------------------------------------------------

/// Anchor points of the viridis colour map, evenly spaced over `0..=1`.
const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

/// Viridis colour for `t` in `0..=1` (clamped; NaN maps to grey).
pub fn viridis(t: f64) -> Color32 {
    if t.is_nan() {
        return Color32::GRAY;
    }
    let t = t.clamp(0.0, 1.0) as f32;
    let scaled = t * (VIRIDIS.len() - 1) as f32;
    let idx = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - idx as f32;
    if frac <= 0.0 || frac >= 1.0 {
        let (r, g, b) = VIRIDIS[if frac >= 1.0 { idx + 1 } else { idx }];
        return Color32::from_rgb(r, g, b);
    }

    let anchor = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = anchor(VIRIDIS[idx]).mix(anchor(VIRIDIS[idx + 1]), frac);
    to_color32(Srgb::from_linear(mixed))
}

/// Text colour readable on top of `background`.
pub fn contrasting_text(background: Color32) -> Color32 {
    let [r, g, b, _] = background.to_array();
    let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    if luma > 140.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Maps the values of a categorical series to distinct colours, so the same
/// payment method or product line keeps its colour across charts.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl Default for ColorMap {
    fn default() -> Self {
        ColorMap {
            mapping: BTreeMap::new(),
            default_color: Color32::GRAY,
        }
    }
}

impl ColorMap {
    /// Build a colour map from the unique values of a dimension.
    pub fn new<'a>(values: impl IntoIterator<Item = &'a String>) -> Self {
        let values: Vec<&String> = values.into_iter().collect();
        let palette = generate_palette(values.len());
        let mapping = values
            .into_iter()
            .zip(palette)
            .map(|(v, c)| (v.clone(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &str) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_length() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn viridis_endpoints() {
        assert_eq!(viridis(0.0), Color32::from_rgb(68, 1, 84));
        assert_eq!(viridis(1.0), Color32::from_rgb(253, 231, 37));
        assert_eq!(viridis(-3.0), viridis(0.0));
        assert_eq!(viridis(f64::NAN), Color32::GRAY);
    }

    #[test]
    fn contrast_picks_readable_text() {
        assert_eq!(contrasting_text(viridis(0.0)), Color32::WHITE);
        assert_eq!(contrasting_text(viridis(1.0)), Color32::BLACK);
    }

    #[test]
    fn color_map_is_stable_and_falls_back() {
        let values = ["Cash".to_string(), "Ewallet".to_string()];
        let cm = ColorMap::new(&values);
        assert_ne!(cm.color_for("Cash"), cm.color_for("Ewallet"));
        assert_eq!(cm.color_for("Cash"), ColorMap::new(&values).color_for("Cash"));
        assert_eq!(cm.color_for("Barter"), Color32::GRAY);
    }
}
