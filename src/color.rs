use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::inference::ColumnType;

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
            hsl_to_color32(hue, 0.75, 0.55)
        })
        .collect()
}

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Column type badges
// ---------------------------------------------------------------------------

/// Badge colour for an inferred column type.
pub fn type_color(ty: ColumnType) -> Color32 {
    match ty {
        ColumnType::Numeric => hsl_to_color32(210.0, 0.70, 0.55),
        ColumnType::Categorical => hsl_to_color32(130.0, 0.55, 0.45),
        ColumnType::Text => hsl_to_color32(35.0, 0.80, 0.55),
        ColumnType::Unknown => Color32::GRAY,
    }
}

/// Fill for a histogram bar; every bin shares one hue.
pub const HISTOGRAM_FILL: Color32 = Color32::from_rgb(100, 149, 237);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let colors = generate_palette(10);
        assert_eq!(colors.len(), 10);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_type_colors_differ() {
        let all = [
            ColumnType::Numeric,
            ColumnType::Categorical,
            ColumnType::Text,
            ColumnType::Unknown,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(type_color(*a), type_color(*b));
            }
        }
    }
}
