use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Plot};

use crate::color;
use crate::data::stats::{ColumnProfile, ColumnStats, FrequencyEntry, HistogramBin};

// ---------------------------------------------------------------------------
// Column statistics chart
// ---------------------------------------------------------------------------

/// Render the bar chart for a column profile: a histogram for numeric columns,
/// a top-values chart for everything else.
pub fn stats_chart(ui: &mut Ui, profile: &ColumnProfile) {
    let (bars, x_label) = match &profile.stats {
        ColumnStats::Histogram(bins) => (histogram_bars(bins), "Bin (lower bound)"),
        ColumnStats::Frequencies(entries) => (frequency_bars(entries), "Value"),
        ColumnStats::Empty => {
            ui.label("No values to chart.");
            return;
        }
    };

    Plot::new(("stats_chart", &profile.column))
        .height(220.0)
        .x_axis_label(x_label)
        .y_axis_label("Count")
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(&profile.column));
        });
}

fn histogram_bars(bins: &[HistogramBin]) -> Vec<Bar> {
    bins.iter()
        .enumerate()
        .map(|(i, bin)| {
            Bar::new(i as f64, bin.count as f64)
                .name(&bin.label)
                .fill(color::HISTOGRAM_FILL)
                .width(0.9)
        })
        .collect()
}

fn frequency_bars(entries: &[FrequencyEntry]) -> Vec<Bar> {
    let palette = color::generate_palette(entries.len());
    entries
        .iter()
        .zip(palette)
        .enumerate()
        .map(|(i, (entry, fill))| {
            Bar::new(i as f64, entry.count as f64)
                .name(&entry.value)
                .fill(fill)
                .width(0.7)
        })
        .collect()
}
