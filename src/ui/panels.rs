use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color;
use crate::data::inference::ColumnType;
use crate::state::{AppState, NoticeLevel, Tab};

// ---------------------------------------------------------------------------
// Left side panel – column list
// ---------------------------------------------------------------------------

/// Render the left column panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Columns");
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let columns = dataset.columns().to_vec();
    let mut clicked = None;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for col in &columns {
                let ty = state
                    .column_types
                    .get(col)
                    .copied()
                    .unwrap_or(ColumnType::Unknown);
                let selected = state.selected_column.as_deref() == Some(col.as_str());

                ui.horizontal(|ui: &mut Ui| {
                    ui.label(
                        RichText::new(ty.as_str())
                            .small()
                            .color(color::type_color(ty)),
                    );
                    if ui.selectable_label(selected, col).clicked() {
                        clicked = Some(col.clone());
                    }
                    if state.insights.contains_key(col) {
                        ui.label(RichText::new("AI").small().weak());
                    }
                });
            }
        });

    if let Some(col) = clicked {
        state.select_column(&col);
        state.active_tab = Tab::Features;
    }
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
            let can_export = state.dataset.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export training input…"))
                .clicked()
            {
                state.show_selection_dialog = true;
                ui.close_menu();
            }
        });

        if ui
            .add_enabled(state.can_undo(), egui::Button::new("Undo"))
            .clicked()
        {
            state.undo();
        }

        ui.separator();
        ui.selectable_value(&mut state.active_tab, Tab::Table, "Table");
        ui.selectable_value(&mut state.active_tab, Tab::Features, "Feature Engineering");
        ui.separator();

        if state.loading {
            ui.spinner();
            ui.label("Loading…");
        } else if let Some(ds) = &state.dataset {
            let name = state
                .source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ui.label(format!(
                "{name}  {} rows × {} columns",
                ds.len(),
                ds.columns().len()
            ));
        }

        ui.separator();

        if let Some(notice) = state.latest_notice() {
            let color = match notice.level {
                NoticeLevel::Info => ui.visuals().text_color(),
                NoticeLevel::Error => Color32::RED,
            };
            ui.label(RichText::new(&notice.text).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset")
        .add_filter("Supported files", &["csv", "txt", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.start_load(path);
    }
}
