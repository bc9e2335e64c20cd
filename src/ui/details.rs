use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::CategoryColors;
use crate::data::summary::{DetailRow, SortKey, Summary};
use crate::state::DetailLayout;

// ---------------------------------------------------------------------------
// Key metrics
// ---------------------------------------------------------------------------

pub fn metrics_row(ui: &mut Ui, summary: &Summary) {
    let metrics = [
        (summary.count.to_string(), "Total Devices"),
        (format!("{:.1}", summary.mean_duration), "Avg Lifecycle (years)"),
        (summary.unique_brands.to_string(), "Unique Brands"),
        (summary.unique_categories.to_string(), "Device Categories"),
    ];

    ui.columns(metrics.len(), |cols: &mut [Ui]| {
        for (col, (value, caption)) in cols.iter_mut().zip(metrics.iter()) {
            egui::Frame::group(col.style()).show(col, |ui: &mut Ui| {
                ui.vertical_centered(|ui: &mut Ui| {
                    ui.label(RichText::new(value).size(28.0).strong());
                    ui.label(*caption);
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Device details
// ---------------------------------------------------------------------------

/// Sort selector, layout toggle and the sorted device list.
pub fn details_section(
    ui: &mut Ui,
    summary: &Summary,
    sort_key: &mut SortKey,
    layout: &mut DetailLayout,
    colors: &CategoryColors,
) {
    ui.heading(format!("Device Details ({} devices)", summary.count));

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Sort by:");
        egui::ComboBox::from_id_salt("detail_sort")
            .selected_text(sort_key.label())
            .show_ui(ui, |ui: &mut Ui| {
                for key in SortKey::ALL {
                    ui.selectable_value(sort_key, key, key.label());
                }
            });

        ui.separator();
        ui.selectable_value(layout, DetailLayout::Cards, "Cards");
        ui.selectable_value(layout, DetailLayout::Table, "Table");
    });
    ui.add_space(6.0);

    match layout {
        DetailLayout::Cards => {
            for row in &summary.details {
                device_card(ui, row, colors);
            }
        }
        DetailLayout::Table => device_table(ui, &summary.details),
    }
}

fn device_card(ui: &mut Ui, row: &DetailRow, colors: &CategoryColors) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new(&row.name).size(18.0).strong());
        ui.label(format!("Brand: {}", row.brand));
        ui.horizontal(|ui: &mut Ui| {
            ui.label(
                RichText::new(&row.category)
                    .color(Color32::WHITE)
                    .background_color(colors.color_for(&row.category)),
            );
            ui.label(
                RichText::new(format!("{:.1} years", row.duration))
                    .color(Color32::WHITE)
                    .background_color(Color32::from_rgb(0x66, 0x33, 0x99)),
            );
        });
        ui.label(format!("Active Period: {}", active_period(row)));
        ui.label(format!("Discontinuation Reason: {}", row.reason));
    });
    ui.add_space(4.0);
}

fn device_table(ui: &mut Ui, rows: &[DetailRow]) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(160.0))
        .columns(Column::auto(), 4)
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["Device", "Brand", "Category", "Active Period", "Years", "Reason"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for row in rows {
                body.row(18.0, |mut cells| {
                    cells.col(|ui: &mut Ui| {
                        ui.label(&row.name);
                    });
                    cells.col(|ui: &mut Ui| {
                        ui.label(&row.brand);
                    });
                    cells.col(|ui: &mut Ui| {
                        ui.label(&row.category);
                    });
                    cells.col(|ui: &mut Ui| {
                        ui.label(active_period(row));
                    });
                    cells.col(|ui: &mut Ui| {
                        ui.label(format!("{:.1}", row.duration));
                    });
                    cells.col(|ui: &mut Ui| {
                        ui.label(&row.reason);
                    });
                });
            }
        });
}

fn active_period(row: &DetailRow) -> String {
    format!("{} - {}", row.start.format("%b %Y"), row.end.format("%b %Y"))
}
