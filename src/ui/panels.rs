use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::{DeviceDataset, DurationRange};
use crate::data::summary::Summary;
use crate::state::{AppState, ALL_BRANDS, ALL_CATEGORIES};

/// Slider step for the duration range, in years.
const DURATION_STEP: f64 = 0.1;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the brand / category / duration controls.
///
/// Every widget shows what the current selection says, so a category picked
/// on the chart appears in the dropdown on the next frame. Widgets write only
/// when the user interacts with them. Returns whether anything changed.
pub fn filter_controls(ui: &mut Ui, state: &mut AppState, dataset: &DeviceDataset) -> bool {
    ui.heading("Filters");
    ui.separator();

    let Some(session) = state.session.as_mut() else {
        ui.label("No dataset loaded.");
        return false;
    };
    let selection = &mut session.selection;
    let mut changed = false;

    // ---- Brand ----
    ui.strong("Select Brand");
    let current_brand = selection.brand_label().to_string();
    egui::ComboBox::from_id_salt("brand_select")
        .selected_text(&current_brand)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(selection.brand().is_none(), ALL_BRANDS)
                .clicked()
            {
                selection.set_brand(None);
                changed = true;
            }
            for brand in &dataset.brands {
                if ui
                    .selectable_label(selection.brand() == Some(brand.as_str()), brand)
                    .clicked()
                {
                    selection.set_brand(Some(brand.clone()));
                    changed = true;
                }
            }
        });
    ui.add_space(6.0);

    // ---- Category (shared with the category chart) ----
    ui.strong("Select Device Category");
    let current_category = selection.category_label().to_string();
    egui::ComboBox::from_id_salt("category_select")
        .selected_text(&current_category)
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            if ui
                .selectable_label(selection.category().is_none(), ALL_CATEGORIES)
                .clicked()
            {
                selection.set_category(None);
                changed = true;
            }
            for category in &dataset.categories {
                if ui
                    .selectable_label(selection.category() == Some(category.as_str()), category)
                    .clicked()
                {
                    selection.set_category(Some(category.clone()));
                    changed = true;
                }
            }
        });
    ui.add_space(6.0);

    // ---- Duration range ----
    ui.strong("Device Lifecycle Duration (years)");
    let bounds = selection.bounds();
    let current = selection.duration();
    let (mut lo, mut hi) = (current.lo, current.hi);
    let lo_changed = ui
        .add(
            egui::Slider::new(&mut lo, bounds.lo..=bounds.hi)
                .step_by(DURATION_STEP)
                .custom_formatter(|v, _| format!("{v:.2}"))
                .text("from"),
        )
        .changed();
    let hi_changed = ui
        .add(
            egui::Slider::new(&mut hi, bounds.lo..=bounds.hi)
                .step_by(DURATION_STEP)
                .custom_formatter(|v, _| format!("{v:.2}"))
                .text("to"),
        )
        .changed();
    if lo_changed || hi_changed {
        let lo = snap_to_bounds(lo, bounds);
        let hi = snap_to_bounds(hi, bounds);
        match selection.set_duration_range(lo, hi) {
            Ok(()) => {
                state.status_message = None;
                changed = true;
            }
            Err(e) => {
                log::warn!("Rejected duration range: {e}");
                state.status_message = Some(e.to_string());
            }
        }
    }
    ui.add_space(8.0);

    // ---- Clear ----
    let Some(session) = state.session.as_mut() else {
        return changed;
    };
    if ui
        .add_enabled(
            !session.selection.is_default(),
            egui::Button::new("Clear All Filters"),
        )
        .clicked()
    {
        log::debug!("Clearing all filters");
        session.selection.clear_all();
        state.status_message = None;
        changed = true;
    }

    changed
}

/// Map a stepped slider value back onto the observed range.
///
/// Steps count from `bounds.lo`, so the top step rarely lands on `bounds.hi`
/// and may overshoot it. Anything within half a step of either end becomes
/// that end exactly, keeping the boundary devices selectable.
fn snap_to_bounds(value: f64, bounds: DurationRange) -> f64 {
    let value = value.clamp(bounds.lo, bounds.hi);
    let half_step = DURATION_STEP / 2.0 + 1e-9;
    if value - bounds.lo <= half_step {
        bounds.lo
    } else if bounds.hi - value <= half_step {
        bounds.hi
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Reasons for discontinuing (sidebar bar chart)
// ---------------------------------------------------------------------------

/// Horizontal bars, one per reason, longest first. With no matching devices
/// there is no summary and only the caption is shown.
pub fn reasons_chart(ui: &mut Ui, summary: Option<&Summary>) {
    ui.separator();
    ui.heading("Reasons for Discontinuing");

    let (reasons, total) = summary.map_or((&[][..], 0), |s| (s.reasons.as_slice(), s.count));
    let max = reasons.first().map(|r| r.count).unwrap_or(0).max(1);

    ScrollArea::vertical()
        .id_salt("reasons_scroll")
        .auto_shrink([false, true])
        .max_height(320.0)
        .show(ui, |ui: &mut Ui| {
            for r in reasons {
                ui.label(&r.reason);
                ui.add(
                    egui::ProgressBar::new(r.count as f32 / max as f32)
                        .text(r.count.to_string())
                        .fill(Color32::from_rgb(0x99, 0x32, 0xCC)),
                );
            }
        });

    ui.small(format!("Based on {total} filtered devices"));
}

// ---------------------------------------------------------------------------
// Blocking load error
// ---------------------------------------------------------------------------

/// Central panel content when no dataset could be loaded.
pub fn load_error(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(80.0);
        match &state.load_error {
            Some(msg) => {
                ui.heading(RichText::new(msg).color(Color32::RED));
                ui.label(format!(
                    "Place the lifecycle table at {} or open another file (File → Open…).",
                    state.source.path().display()
                ));
            }
            None => {
                ui.heading("Open a file to view devices  (File → Open…)");
            }
        }
        ui.add_space(8.0);
        if ui.button("Retry").clicked() {
            state.reload();
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(session) = &state.session {
            let ds = &session.dataset;
            let mut info = format!(
                "{}: {} devices, {} brands, {} categories",
                state.source.path().display(),
                ds.len(),
                ds.brands.len(),
                ds.categories.len()
            );
            if let Some((first, last)) = ds.year_span() {
                info.push_str(&format!(", {first}–{last}"));
            }
            ui.label(info);
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open device lifecycle data")
        .add_filter("Supported files", &["xlsx", "xls", "csv", "json", "parquet", "pq"])
        .add_filter("Excel", &["xlsx", "xls"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::filter;
    use crate::data::model::tests::date;
    use crate::data::model::{years_between, DeviceRecord};
    use crate::state::SelectionState;

    /// Where an egui slider stepping from `bounds.lo` puts a dragged value.
    fn stepped(value: f64, bounds: DurationRange) -> f64 {
        let value = value.clamp(bounds.lo, bounds.hi);
        bounds.lo + ((value - bounds.lo) / DURATION_STEP).round() * DURATION_STEP
    }

    fn record(name: &str, start: &str, end: &str) -> DeviceRecord {
        let (start, end) = (date(start), date(end));
        DeviceRecord {
            name: name.to_string(),
            brand: "Wink".to_string(),
            category: "Smart Home".to_string(),
            start,
            end,
            duration: years_between(start, end),
            reason: "Server shutdown".to_string(),
        }
    }

    #[test]
    fn sliders_at_their_ends_keep_every_device() {
        let ds = DeviceDataset::from_records(vec![
            record("Short", "2014-01-01", "2014-04-09"),
            record("Long", "2014-01-01", "2024-09-16"),
        ]);
        let bounds = ds.duration_bounds;
        let mut selection = SelectionState::for_dataset(&ds);

        let lo = snap_to_bounds(stepped(bounds.lo, bounds), bounds);
        let hi = snap_to_bounds(stepped(bounds.hi, bounds), bounds);
        assert_eq!((lo, hi), (bounds.lo, bounds.hi));

        selection.set_duration_range(lo, hi).unwrap();
        assert_eq!(filter(&ds, &selection).len(), 2);
    }

    #[test]
    fn snapping_only_touches_values_near_the_ends() {
        let bounds = DurationRange::new(0.27, 10.71);
        assert_eq!(snap_to_bounds(0.31, bounds), 0.27);
        assert_eq!(snap_to_bounds(10.67, bounds), 10.71);
        assert_eq!(snap_to_bounds(10.75, bounds), 10.71);
        assert_eq!(snap_to_bounds(0.0, bounds), 0.27);
        assert_eq!(snap_to_bounds(4.27, bounds), 4.27);
    }
}
