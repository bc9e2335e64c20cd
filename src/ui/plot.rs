use eframe::egui::{RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints, PlotResponse, Points};

use crate::color::CategoryColors;
use crate::data::model::DeviceRecord;
use crate::data::summary::{category_counts, TimelineEntry};

// ---------------------------------------------------------------------------
// Category chart (clickable)
// ---------------------------------------------------------------------------

/// Bar chart of devices per category. Returns the category whose bar was
/// clicked this frame, if any.
pub fn category_chart<'a>(
    ui: &mut Ui,
    records: impl IntoIterator<Item = &'a DeviceRecord>,
    colors: &CategoryColors,
    selected: Option<&str>,
) -> Option<String> {
    ui.heading("Devices by Category");
    ui.label(RichText::new("Click a bar to filter by that category").weak());

    let counts = category_counts(records);
    let labels: Vec<String> = counts.iter().map(|(c, _)| c.clone()).collect();

    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (category, n))| {
            Bar::new(i as f64, *n as f64)
                .name(category)
                .width(0.8)
                .fill(colors.segment_color(category, selected))
        })
        .collect();

    let axis_labels = labels.clone();
    let PlotResponse {
        response,
        inner: pointer,
        ..
    } = Plot::new("category_chart")
        .height(220.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .y_axis_label("Devices")
        .x_axis_formatter(move |mark: GridMark, _range| {
            index_label(&axis_labels, mark.value).unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Categories"));
            plot_ui.pointer_coordinate()
        });

    if !response.clicked() {
        return None;
    }
    let x = pointer?.x;
    let idx = x.round();
    if (x - idx).abs() > 0.4 {
        return None;
    }
    let clicked = index_label(&labels, idx)?;
    log::debug!("Category chart clicked: {clicked}");
    Some(clicked)
}

/// Label at an integer axis position, `None` between bars or out of range.
fn index_label(labels: &[String], value: f64) -> Option<String> {
    if value.fract() != 0.0 || value < 0.0 {
        return None;
    }
    labels.get(value as usize).cloned()
}

// ---------------------------------------------------------------------------
// Support timeline
// ---------------------------------------------------------------------------

/// One horizontal segment per device from start to end of support.
pub fn timeline_plot(ui: &mut Ui, entries: &[TimelineEntry], colors: &CategoryColors) {
    ui.heading("Device Support Timeline");
    ui.label(RichText::new("Hover over any point on the timeline to view full product information").weak());

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (category, color) in colors.legend_entries() {
            if entries.iter().any(|e| e.category == category) {
                ui.colored_label(color, format!("■ {category}"));
            }
        }
    });

    let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
    let hover: Vec<String> = entries.iter().map(hover_text).collect();
    let height = (entries.len() as f32 * 25.0).max(400.0);

    Plot::new("timeline_plot")
        .height(height)
        .x_axis_label("Date")
        .y_axis_label("Devices")
        .allow_scroll(false)
        .x_axis_formatter(|mark: GridMark, _range| {
            if mark.value.fract() == 0.0 {
                format!("{:.0}", mark.value)
            } else {
                String::new()
            }
        })
        .y_axis_formatter(move |mark: GridMark, _range| {
            index_label(&labels, mark.value).unwrap_or_default()
        })
        .label_formatter(move |name, _point| {
            series_hover(&hover, name).unwrap_or_default().to_string()
        })
        .show(ui, |plot_ui| {
            for (i, entry) in entries.iter().enumerate() {
                let y = i as f64;
                let color = colors.color_for(&entry.category);
                let name = series_name(i);

                let segment = PlotPoints::new(vec![[entry.start_x, y], [entry.end_x, y]]);
                plot_ui.line(Line::new(segment).name(&name).color(color).width(6.0));

                let ends = PlotPoints::new(vec![[entry.start_x, y], [entry.end_x, y]]);
                plot_ui.points(Points::new(ends).name(&name).color(color).radius(4.0));
            }
        });
}

/// Series are named by row, since device names need not be unique.
fn series_name(row: usize) -> String {
    format!("device-{row}")
}

fn series_hover<'a>(hover: &'a [String], name: &str) -> Option<&'a str> {
    let row: usize = name.strip_prefix("device-")?.parse().ok()?;
    hover.get(row).map(String::as_str)
}

fn hover_text(entry: &TimelineEntry) -> String {
    format!(
        "{}\nBrand: {}\nCategory: {}\nSupport: {} - {}\nDuration: {:.1} years\nReason: {}",
        entry.name,
        entry.brand,
        entry.category,
        entry.start.format("%b %Y"),
        entry.end.format("%b %Y"),
        entry.duration,
        entry.reason
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn index_label_only_on_integer_marks() {
        let labels = vec!["Phone".to_string(), "Tablet".to_string()];
        assert_eq!(index_label(&labels, 0.0).as_deref(), Some("Phone"));
        assert_eq!(index_label(&labels, 1.0).as_deref(), Some("Tablet"));
        assert_eq!(index_label(&labels, 0.5), None);
        assert_eq!(index_label(&labels, 2.0), None);
        assert_eq!(index_label(&labels, -1.0), None);
    }

    fn entry(name: &str, brand: &str) -> TimelineEntry {
        TimelineEntry {
            name: name.to_string(),
            label: name.to_string(),
            brand: brand.to_string(),
            category: "Smart Home".to_string(),
            start_x: 2014.0,
            end_x: 2018.0,
            start: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            duration: 4.0,
            reason: "Server shutdown".to_string(),
        }
    }

    #[test]
    fn devices_sharing_a_name_keep_their_own_hover() {
        let hover: Vec<String> = [entry("Hub", "Wink"), entry("Hub", "Revolv")]
            .iter()
            .map(hover_text)
            .collect();

        let first = series_hover(&hover, &series_name(0)).unwrap();
        let second = series_hover(&hover, &series_name(1)).unwrap();
        assert!(first.contains("Brand: Wink"));
        assert!(second.contains("Brand: Revolv"));
        assert_eq!(series_hover(&hover, &series_name(2)), None);
        assert_eq!(series_hover(&hover, "Hub"), None);
    }

    #[test]
    fn hover_text_lists_device_facts() {
        let entry = TimelineEntry {
            name: "Pebble Time".to_string(),
            label: "Pebble Time".to_string(),
            brand: "Pebble".to_string(),
            category: "Smartwatch".to_string(),
            start_x: 2015.33,
            end_x: 2018.5,
            start: NaiveDate::from_ymd_opt(2015, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2018, 6, 30).unwrap(),
            duration: 3.16,
            reason: "Company acquired".to_string(),
        };
        let text = hover_text(&entry);
        assert!(text.starts_with("Pebble Time\n"));
        assert!(text.contains("Support: May 2015 - Jun 2018"));
        assert!(text.contains("Duration: 3.2 years"));
    }
}
