use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{parse_number, Dataset};

/// Below this many distinct values a non-numeric column counts as categorical.
pub const CATEGORICAL_MAX_DISTINCT: usize = 10;

// ---------------------------------------------------------------------------
// ColumnType
// ---------------------------------------------------------------------------

/// Inferred semantic kind of a column. Derived from a snapshot, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Text,
    /// The column has no non-missing value (or does not exist).
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Text => "text",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a column.
///
/// Numeric parseability is checked before cardinality, so a column of numbers
/// with only a handful of distinct values is still `Numeric`.
pub fn infer_column_type(dataset: &Dataset, column: &str) -> ColumnType {
    let mut any = false;
    let mut numeric = true;
    let mut distinct: HashSet<&str> = HashSet::new();

    for value in dataset.present_values(column) {
        any = true;
        if numeric && parse_number(value).is_none() {
            numeric = false;
        }
        // Only the first few distinct values matter for the cardinality check.
        if distinct.len() < CATEGORICAL_MAX_DISTINCT {
            distinct.insert(value);
        }
    }

    if !any {
        ColumnType::Unknown
    } else if numeric {
        ColumnType::Numeric
    } else if distinct.len() < CATEGORICAL_MAX_DISTINCT {
        ColumnType::Categorical
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Row};

    fn dataset(values: &[Option<&str>]) -> Dataset {
        let rows: Vec<Row> = values
            .iter()
            .map(|v| {
                let cell = match v {
                    Some(s) => CellValue::text(*s),
                    None => CellValue::Null,
                };
                Row::from([("c".to_string(), cell)])
            })
            .collect();
        Dataset::new(vec!["c".into()], rows).unwrap()
    }

    #[test]
    fn test_all_missing_is_unknown() {
        let ds = dataset(&[None, Some(""), None]);
        assert_eq!(infer_column_type(&ds, "c"), ColumnType::Unknown);
    }

    #[test]
    fn test_nonexistent_column_is_unknown() {
        let ds = dataset(&[Some("1")]);
        assert_eq!(infer_column_type(&ds, "nope"), ColumnType::Unknown);
    }

    #[test]
    fn test_numeric_takes_priority_over_cardinality() {
        let ds = dataset(&[Some("1"), Some("2"), Some("1"), None, Some("2.5")]);
        assert_eq!(infer_column_type(&ds, "c"), ColumnType::Numeric);
    }

    #[test]
    fn test_one_non_numeric_value_breaks_numeric() {
        let ds = dataset(&[Some("1"), Some("2"), Some("n/a")]);
        assert_eq!(infer_column_type(&ds, "c"), ColumnType::Categorical);
    }

    #[test]
    fn test_categorical_boundary() {
        let nine: Vec<String> = (0..9).map(|i| format!("v{i}")).collect();
        let ds = dataset(&nine.iter().map(|s| Some(s.as_str())).collect::<Vec<_>>());
        assert_eq!(infer_column_type(&ds, "c"), ColumnType::Categorical);

        let ten: Vec<String> = (0..10).map(|i| format!("v{i}")).collect();
        let ds = dataset(&ten.iter().map(|s| Some(s.as_str())).collect::<Vec<_>>());
        assert_eq!(infer_column_type(&ds, "c"), ColumnType::Text);
    }
}
