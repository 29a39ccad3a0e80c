use std::time::Duration;

use eframe::egui;

use crate::config::Settings;
use crate::state::{AppState, Tab};
use crate::ui::{features, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct FeatureLabApp {
    pub state: AppState,
}

impl FeatureLabApp {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AppState::new(settings),
        }
    }
}

impl eframe::App for FeatureLabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Pick up finished background loads / analyses.
        self.state.poll();
        if self.state.has_pending_jobs() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: columns ----
        egui::SidePanel::left("column_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: table or feature engineering ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.active_tab {
            Tab::Table => table::data_table(ui, &mut self.state),
            Tab::Features => features::feature_panel(ui, &mut self.state),
        });

        features::selection_dialog(ctx, &mut self.state);
    }
}
