use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::CategoryColors;
use crate::data::filter::filter;
use crate::data::summary::{timeline, Summary};
use crate::state::AppState;
use crate::ui::{details, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DeviceDashboardApp {
    pub state: AppState,
}

impl DeviceDashboardApp {
    pub fn new(data_path: PathBuf) -> Self {
        Self {
            state: AppState::open(data_path),
        }
    }
}

impl eframe::App for DeviceDashboardApp {
    /// One pass of load (cached) → selection → filter → summarize → render.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        let Some(dataset) = self
            .state
            .session
            .as_ref()
            .map(|s| Arc::clone(&s.dataset))
        else {
            egui::CentralPanel::default().show(ctx, |ui| {
                panels::load_error(ui, &mut self.state);
            });
            return;
        };
        let colors = CategoryColors::new(&dataset.categories);

        // ---- Left side panel: filters + reasons ----
        let summary = egui::SidePanel::left("filter_panel")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                ScrollArea::vertical()
                    .id_salt("sidebar_scroll")
                    .show(ui, |ui: &mut Ui| -> Option<Summary> {
                        if panels::filter_controls(ui, &mut self.state, &dataset) {
                            ctx.request_repaint();
                        }
                        // Summarized after the controls so this frame's picks show.
                        let session = self.state.session.as_ref()?;
                        let view = filter(&dataset, &session.selection);
                        let summary = Summary::from_view(&view, self.state.sort_key);
                        panels::reasons_chart(ui, summary.as_ref());
                        summary
                    })
                    .inner
            })
            .inner;

        // ---- Central panel: metrics, charts, details ----
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = self.state.session.as_mut() else {
                return;
            };

            ScrollArea::vertical()
                .id_salt("main_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    ui.vertical_centered(|ui: &mut Ui| {
                        ui.heading(RichText::new("Device Lifecycle Dashboard").size(32.0).strong());
                    });
                    ui.add_space(8.0);

                    let Some(summary) = &summary else {
                        ui.label(
                            RichText::new(
                                "No devices match the selected filters. Please adjust your selection.",
                            )
                            .color(Color32::from_rgb(0xE0, 0x9F, 0x1F))
                            .size(16.0),
                        );
                        return;
                    };

                    let view = filter(&dataset, &session.selection);
                    details::metrics_row(ui, summary);
                    ui.separator();

                    let selected = session.selection.category().map(str::to_string);
                    if let Some(category) =
                        plot::category_chart(ui, &dataset.records, &colors, selected.as_deref())
                    {
                        session.selection.select_from_chart(&category);
                        ctx.request_repaint();
                    }
                    ui.separator();

                    plot::timeline_plot(ui, &timeline(&view), &colors);
                    ui.separator();

                    details::details_section(
                        ui,
                        summary,
                        &mut self.state.sort_key,
                        &mut self.state.detail_layout,
                        &colors,
                    );
                });
        });
    }
}
