use eframe::egui::{self, Color32, RichText, Ui};

use crate::color;
use crate::data::inference::ColumnType;
use crate::data::transform::Transform;
use crate::state::AppState;
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Feature engineering tab
// ---------------------------------------------------------------------------

/// Render the feature engineering view: dataset-level analysis on top, the
/// selected column's profile, transforms and AI insight below.
pub fn feature_panel(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to engineer features  (File → Open…)");
        });
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            variable_section(ui, state);
            ui.separator();
            column_section(ui, state);
            ui.separator();
            history_section(ui, state);
        });
}

fn variable_section(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Variables");
        if state.variables_pending {
            ui.spinner();
            ui.label("Analyzing…");
        } else if ui.button("Analyze variables (AI)").clicked() {
            state.request_variable_analysis();
        }
        if ui.button("Select features…").clicked() {
            state.show_selection_dialog = true;
        }
    });

    let Some(analysis) = &state.variables else {
        return;
    };
    egui::Grid::new("variable_analysis")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            ui.strong("Dependent (target)");
            ui.label(list_or_dash(&analysis.dependent));
            ui.end_row();
            ui.strong("Independent (features)");
            ui.label(list_or_dash(&analysis.independent));
            ui.end_row();
            ui.strong("Suggested removal");
            ui.label(list_or_dash(&analysis.remove));
            ui.end_row();
        });
    if ui.button("Use suggestion").clicked() {
        state.use_suggested_selection();
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn column_section(ui: &mut Ui, state: &mut AppState) {
    let Some(column) = state.selected_column.clone() else {
        ui.label("Select a column on the left.");
        return;
    };
    let ty = state
        .column_types
        .get(&column)
        .copied()
        .unwrap_or(ColumnType::Unknown);

    ui.horizontal(|ui: &mut Ui| {
        ui.heading(&column);
        ui.label(RichText::new(ty.as_str()).color(color::type_color(ty)).strong());
    });

    if let Some(profile) = &state.profile {
        ui.label(format!(
            "{} values, {} missing, {} distinct",
            profile.total, profile.missing, profile.distinct
        ));
        plot::stats_chart(ui, profile);
    }

    ui.add_space(6.0);
    transform_buttons(ui, state, &column, ty);
    rename_editor(ui, state, &column);

    ui.add_space(6.0);
    insight_section(ui, state, &column);
}

fn transform_buttons(ui: &mut Ui, state: &mut AppState, column: &str, ty: ColumnType) {
    let mut requested = None;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        if ui.button("Drop column").clicked() {
            requested = Some(Transform::DropColumn {
                column: column.to_string(),
            });
        }
        if ui.button("Drop missing").clicked() {
            requested = Some(Transform::DropMissing {
                column: column.to_string(),
            });
        }
        if ui
            .add_enabled(ty == ColumnType::Numeric, egui::Button::new("Normalize"))
            .on_disabled_hover_text("Only numeric columns can be normalized")
            .clicked()
        {
            requested = Some(Transform::Normalize {
                column: column.to_string(),
            });
        }
        if ui
            .add_enabled(ty != ColumnType::Unknown, egui::Button::new("One-hot encode"))
            .clicked()
        {
            requested = Some(Transform::OneHot {
                column: column.to_string(),
            });
        }
        if state.renaming.is_none() && ui.button("Rename…").clicked() {
            state.start_rename(column);
        }
    });
    if let Some(t) = requested {
        state.apply_transform(t);
    }
}

fn rename_editor(ui: &mut Ui, state: &mut AppState, column: &str) {
    if state.renaming.as_deref() != Some(column) {
        return;
    }
    ui.horizontal(|ui: &mut Ui| {
        ui.label("New name:");
        let response = ui.text_edit_singleline(&mut state.rename_buffer);
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if submitted || ui.button("Apply").clicked() {
            state.commit_rename();
        } else if ui.button("Cancel").clicked() {
            state.renaming = None;
        }
    });
}

fn insight_section(ui: &mut Ui, state: &mut AppState, column: &str) {
    let pending = state.pending_insights.contains(column);
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("AI insight");
        if pending {
            ui.spinner();
        } else if ui.small_button("Analyze").clicked() {
            state.request_column_insight(column);
        }
    });

    match state.insights.get(column) {
        Some(insight) => {
            egui::Grid::new(("insight", column))
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui: &mut Ui| {
                    ui.label("Description");
                    ui.label(&insight.description);
                    ui.end_row();
                    ui.label("ML use");
                    ui.label(&insight.ml_use);
                    ui.end_row();
                    ui.label("Preprocessing");
                    ui.label(insight.preprocessing.to_string());
                    ui.end_row();
                });
        }
        None if !pending => {
            ui.label(RichText::new("Not analyzed yet.").color(Color32::GRAY));
        }
        None => {}
    }
}

fn history_section(ui: &mut Ui, state: &mut AppState) {
    egui::CollapsingHeader::new(format!("Applied transforms ({})", state.applied.len()))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for (i, t) in state.applied.iter().enumerate() {
                ui.label(format!("{}. {t}", i + 1));
            }
        });
    if ui
        .add_enabled(state.can_undo(), egui::Button::new("Undo last transform"))
        .clicked()
    {
        state.undo();
    }
}

// ---------------------------------------------------------------------------
// Feature / target selection dialog
// ---------------------------------------------------------------------------

/// Floating window for picking features and the target, then exporting.
pub fn selection_dialog(ctx: &egui::Context, state: &mut AppState) {
    if !state.show_selection_dialog {
        return;
    }
    let Some(columns) = state.dataset.as_ref().map(|d| d.columns().to_vec()) else {
        return;
    };

    let mut open = true;
    let mut export = false;
    egui::Window::new("Select Features")
        .open(&mut open)
        .resizable(true)
        .default_width(320.0)
        .show(ctx, |ui: &mut Ui| {
            ui.strong("Features");
            egui::ScrollArea::vertical()
                .max_height(240.0)
                .show(ui, |ui: &mut Ui| {
                    for col in &columns {
                        let mut checked = state.selection.features.contains(col);
                        if ui.checkbox(&mut checked, col).changed() {
                            if checked {
                                state.selection.features.push(col.clone());
                            } else {
                                state.selection.features.retain(|c| c != col);
                            }
                        }
                    }
                });

            ui.separator();
            ui.horizontal(|ui: &mut Ui| {
                ui.strong("Target");
                let shown = if state.selection.target.is_empty() {
                    "(choose)"
                } else {
                    state.selection.target.as_str()
                };
                egui::ComboBox::from_id_salt("target_column")
                    .selected_text(shown.to_string())
                    .show_ui(ui, |ui: &mut Ui| {
                        for col in &columns {
                            ui.selectable_value(&mut state.selection.target, col.clone(), col);
                        }
                    });
            });

            ui.separator();
            let verdict = match &state.dataset {
                Some(ds) => state.selection.validate(ds),
                None => Ok(()),
            };
            if let Err(e) = &verdict {
                ui.label(RichText::new(e.to_string()).color(Color32::RED));
            }
            if ui
                .add_enabled(verdict.is_ok(), egui::Button::new("Export training input…"))
                .clicked()
            {
                export = true;
            }
        });

    if !open {
        state.show_selection_dialog = false;
    }
    if export {
        save_training_dialog(state);
    }
}

fn save_training_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export training input")
        .set_file_name("training_input.json")
        .add_filter("JSON", &["json"])
        .save_file();

    if let Some(path) = file {
        state.export_training_input(&path);
    }
}
