use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::inference::{infer_column_type, ColumnType};
use super::model::{parse_number, Dataset};
use crate::error::DataError;

/// Bucket count of a numeric histogram.
pub const HISTOGRAM_BINS: usize = 10;

/// Length of a frequency table.
pub const TOP_VALUES: usize = 10;

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

/// One equal-width bucket of a numeric histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Lower bound with two decimals, used as the axis label.
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Occurrence count of one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Column summary: a histogram for numeric columns, a frequency table otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum ColumnStats {
    Histogram(Vec<HistogramBin>),
    Frequencies(Vec<FrequencyEntry>),
    /// Nothing to summarise (unknown column type).
    Empty,
}

/// Type, stats and counts of one column, all taken from the same snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub column: String,
    pub column_type: ColumnType,
    pub stats: ColumnStats,
    pub total: usize,
    pub missing: usize,
    pub distinct: usize,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Summarise a column given its type.
///
/// `column_type` must be what [`infer_column_type`] returns for the same
/// snapshot; a numeric request against a non-numeric value is rejected.
pub fn column_stats(
    dataset: &Dataset,
    column: &str,
    column_type: ColumnType,
) -> Result<ColumnStats, DataError> {
    match column_type {
        ColumnType::Unknown => Ok(ColumnStats::Empty),
        ColumnType::Numeric => {
            let numbers = dataset
                .present_values(column)
                .map(|v| {
                    parse_number(v).ok_or_else(|| {
                        DataError::precondition(format!(
                            "column \"{column}\" has non-numeric value \"{v}\""
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, DataError>>()?;
            Ok(ColumnStats::Histogram(histogram(&numbers)))
        }
        ColumnType::Categorical | ColumnType::Text => Ok(ColumnStats::Frequencies(
            frequencies(dataset.present_values(column)),
        )),
    }
}

/// Infer and summarise a column in one pass over the snapshot.
pub fn profile_column(dataset: &Dataset, column: &str) -> ColumnProfile {
    let column_type = infer_column_type(dataset, column);
    // The type was inferred from this very snapshot, so the numeric path cannot fail.
    let stats = column_stats(dataset, column, column_type).unwrap_or(ColumnStats::Empty);

    let total = dataset.column_values(column).count();
    let present: Vec<&str> = dataset.present_values(column).collect();
    let distinct = present.iter().collect::<HashSet<_>>().len();

    ColumnProfile {
        column: column.to_string(),
        column_type,
        stats,
        total,
        missing: total - present.len(),
        distinct,
    }
}

/// Ten equal-width buckets over `[min, max)`, with `max` itself in the last one.
pub fn histogram(numbers: &[f64]) -> Vec<HistogramBin> {
    if numbers.is_empty() {
        return Vec::new();
    }
    let min = numbers.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let bins = HISTOGRAM_BINS as f64;
    // Scaled before subtracting so a span like [-1e308, 1e308] stays finite.
    let width = max / bins - min / bins;

    if !(width.is_finite() && width > 0.0) {
        // Zero spread: one bucket holding everything.
        return vec![HistogramBin {
            label: format!("{min:.2}"),
            lower: min,
            upper: max,
            count: numbers.len(),
        }];
    }

    let mut counts = [0usize; HISTOGRAM_BINS];
    for &n in numbers {
        // Both sides are already divided by `bins`, so this is the position in [0, 1].
        let position = (n / bins - min / bins) / width;
        let idx = ((position * bins).floor() as usize).min(HISTOGRAM_BINS - 1);
        counts[idx] += 1;
    }

    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lower = min + i as f64 * width;
            let upper = if i + 1 == HISTOGRAM_BINS {
                max
            } else {
                min + (i + 1) as f64 * width
            };
            HistogramBin {
                label: format!("{lower:.2}"),
                lower,
                upper,
                count,
            }
        })
        .collect()
}

/// Exact-string counts, most frequent first, ties in first-seen order, top ten.
pub fn frequencies<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<FrequencyEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();

    for v in values {
        match index.get(v) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(v, entries.len());
                entries.push(FrequencyEntry {
                    value: v.to_string(),
                    count: 1,
                });
            }
        }
    }

    // `sort_by` is stable, which keeps first-seen order among equal counts.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_VALUES);
    entries
}
