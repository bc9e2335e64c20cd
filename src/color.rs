use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

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
            let hue = (270.0 + (i as f32 / n as f32) * 360.0) % 360.0;
            let hsl = Hsl::new(hue, 0.6, 0.5);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Device category → Color32
// ---------------------------------------------------------------------------

/// Stable colour per device category, shared by the timeline, the category
/// chart and the detail badges.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    pub fn new(categories: &BTreeSet<String>) -> Self {
        let mapping = categories
            .iter()
            .cloned()
            .zip(generate_palette(categories.len()))
            .collect();

        CategoryColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, category: &str) -> Color32 {
        self.mapping
            .get(category)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Colour for a chart segment; segments other than the selected
    /// category are faded while a category is selected.
    pub fn segment_color(&self, category: &str, selected: Option<&str>) -> Color32 {
        let color = self.color_for(category);
        match selected {
            Some(sel) if sel != category => color.gamma_multiply(0.3),
            _ => color,
        }
    }

    /// Return the legend entries (category → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(category, c)| (category.clone(), *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> BTreeSet<String> {
        ["Smart Home", "Smartwatch", "Tablet"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn palette_is_distinct() {
        let palette = generate_palette(5);
        assert_eq!(palette.len(), 5);
        let unique: BTreeSet<_> = palette.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 5);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_category_is_gray() {
        let colors = CategoryColors::new(&categories());
        assert_eq!(colors.color_for("Robot"), Color32::GRAY);
        assert_ne!(colors.color_for("Tablet"), Color32::GRAY);
    }

    #[test]
    fn unselected_segments_fade() {
        let colors = CategoryColors::new(&categories());
        let tablet = colors.color_for("Tablet");
        assert_eq!(colors.segment_color("Tablet", None), tablet);
        assert_eq!(colors.segment_color("Tablet", Some("Tablet")), tablet);
        assert_ne!(colors.segment_color("Tablet", Some("Smartwatch")), tablet);
    }

    #[test]
    fn legend_is_alphabetical() {
        let colors = CategoryColors::new(&categories());
        let names: Vec<String> = colors.legend_entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Smart Home", "Smartwatch", "Tablet"]);
    }
}
