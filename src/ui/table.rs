use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::CellValue;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Paginated data table (central panel, "Table" tab)
// ---------------------------------------------------------------------------

/// Render the current page of the dataset with pager controls underneath.
pub fn data_table(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view data  (File → Open…)");
        });
        return;
    };

    let per_page = state.settings.table.rows_per_page;
    let columns = dataset.columns().to_vec();
    let rows = dataset.page(state.page, per_page).to_vec();
    let first_row = (state.page - 1) * per_page.max(1);
    let total = dataset.len();

    let mut clicked_column = None;

    // Leave room for the pager.
    let table_height = (ui.available_height() - 36.0).max(80.0);
    egui::ScrollArea::horizontal()
        .max_height(table_height)
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .column(Column::auto().at_least(40.0))
                .columns(Column::auto().at_least(80.0).clip(true), columns.len())
                .header(22.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("#");
                    });
                    for col in &columns {
                        header.col(|ui| {
                            let selected = state.selected_column.as_deref() == Some(col.as_str());
                            if ui.selectable_label(selected, RichText::new(col).strong()).clicked() {
                                clicked_column = Some(col.clone());
                            }
                        });
                    }
                })
                .body(|mut body| {
                    body.rows(20.0, rows.len(), |mut row| {
                        let idx = row.index();
                        let record = &rows[idx];
                        row.col(|ui| {
                            ui.label(RichText::new((first_row + idx + 1).to_string()).weak());
                        });
                        for col in &columns {
                            row.col(|ui| match record.get(col) {
                                Some(CellValue::Text(s)) => {
                                    ui.label(s.as_str());
                                }
                                _ => {
                                    ui.label(RichText::new("null").italics().color(Color32::GRAY));
                                }
                            });
                        }
                    });
                });
        });

    if let Some(col) = clicked_column {
        state.select_column(&col);
    }

    ui.separator();
    pager(ui, state, total);
}

fn pager(ui: &mut Ui, state: &mut AppState, total: usize) {
    let pages = state.page_count();
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .add_enabled(state.page > 1, egui::Button::new("◀ Previous"))
            .clicked()
        {
            state.prev_page();
        }
        ui.label(format!("Page {} of {pages}  ({total} rows)", state.page));
        if ui
            .add_enabled(state.page < pages, egui::Button::new("Next ▶"))
            .clicked()
        {
            state.next_page();
        }
    });
}
