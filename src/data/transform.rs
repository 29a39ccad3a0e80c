use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{parse_number, CellValue, Dataset, Row};
use crate::error::DataError;

/// Suffix of the column added by min-max normalisation.
pub const NORMALIZED_SUFFIX: &str = "_normalized";

// ---------------------------------------------------------------------------
// Transform descriptor
// ---------------------------------------------------------------------------

/// One feature-engineering operation on a dataset snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transform {
    DropColumn { column: String },
    RenameColumn { from: String, to: String },
    DropMissing { column: String },
    Normalize { column: String },
    OneHot { column: String },
}

impl Transform {
    /// The column the operation acts on.
    pub fn column(&self) -> &str {
        match self {
            Transform::DropColumn { column }
            | Transform::DropMissing { column }
            | Transform::Normalize { column }
            | Transform::OneHot { column } => column,
            Transform::RenameColumn { from, .. } => from,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::DropColumn { column } => write!(f, "drop column \"{column}\""),
            Transform::RenameColumn { from, to } => write!(f, "rename \"{from}\" to \"{to}\""),
            Transform::DropMissing { column } => write!(f, "drop missing in \"{column}\""),
            Transform::Normalize { column } => write!(f, "normalize \"{column}\""),
            Transform::OneHot { column } => write!(f, "one-hot encode \"{column}\""),
        }
    }
}

/// A successfully applied transform: the new snapshot and a message for the user.
#[derive(Debug, Clone)]
pub struct Applied {
    pub dataset: Dataset,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Apply a transform to a snapshot, producing a new one.
///
/// The input is only borrowed, so an error leaves the caller's dataset exactly
/// as it was.
pub fn apply(dataset: &Dataset, transform: &Transform) -> Result<Applied, DataError> {
    match transform {
        Transform::DropColumn { column } => drop_column(dataset, column),
        Transform::RenameColumn { from, to } => rename_column(dataset, from, to),
        Transform::DropMissing { column } => drop_missing(dataset, column),
        Transform::Normalize { column } => normalize(dataset, column),
        Transform::OneHot { column } => one_hot(dataset, column),
    }
}

fn drop_column(dataset: &Dataset, column: &str) -> Result<Applied, DataError> {
    if !dataset.has_column(column) {
        log::debug!("drop of absent column \"{column}\" is a no-op");
        return Ok(Applied {
            dataset: dataset.clone(),
            summary: format!("Column \"{column}\" is already absent"),
        });
    }

    let columns: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| c.as_str() != column)
        .cloned()
        .collect();
    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.remove(column);
            row
        })
        .collect();

    Ok(Applied {
        dataset: Dataset::from_parts(columns, rows),
        summary: format!("Column \"{column}\" dropped"),
    })
}

fn rename_column(dataset: &Dataset, from: &str, to: &str) -> Result<Applied, DataError> {
    let to = to.trim();
    if to.is_empty() {
        return Err(DataError::precondition("new column name must not be empty"));
    }
    let Some(idx) = dataset.column_index(from) else {
        return Err(DataError::no_such_column(from));
    };
    if from == to {
        return Ok(Applied {
            dataset: dataset.clone(),
            summary: format!("Column \"{from}\" unchanged"),
        });
    }
    if dataset.has_column(to) {
        return Err(DataError::precondition(format!(
            "cannot rename \"{from}\": column \"{to}\" already exists"
        )));
    }

    let mut columns = dataset.columns().to_vec();
    columns[idx] = to.to_string();
    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            let value = row.remove(from).unwrap_or_default();
            row.insert(to.to_string(), value);
            row
        })
        .collect();

    Ok(Applied {
        dataset: Dataset::from_parts(columns, rows),
        summary: format!("Column \"{from}\" renamed to \"{to}\""),
    })
}

fn drop_missing(dataset: &Dataset, column: &str) -> Result<Applied, DataError> {
    if !dataset.has_column(column) {
        return Err(DataError::no_such_column(column));
    }

    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .filter(|row| row.get(column).is_some_and(|v| !v.is_missing()))
        .cloned()
        .collect();
    let removed = dataset.len() - rows.len();

    Ok(Applied {
        dataset: Dataset::from_parts(dataset.columns().to_vec(), rows),
        summary: format!("Removed {removed} rows with missing \"{column}\""),
    })
}

fn normalize(dataset: &Dataset, column: &str) -> Result<Applied, DataError> {
    if !dataset.has_column(column) {
        return Err(DataError::no_such_column(column));
    }

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in dataset.present_values(column) {
        let n = parse_number(v).ok_or_else(|| {
            DataError::precondition(format!(
                "cannot normalize \"{column}\": \"{v}\" is not a number"
            ))
        })?;
        min = min.min(n);
        max = max.max(n);
    }
    if min > max {
        return Err(DataError::precondition(format!(
            "cannot normalize \"{column}\": it has no values"
        )));
    }

    let range = max - min;
    if !range.is_finite() {
        return Err(DataError::degenerate(format!(
            "range of \"{column}\" overflows ({min} to {max})"
        )));
    }
    if range == 0.0 {
        log::warn!("\"{column}\" has zero variance; normalized values are all 0");
    }

    let target = format!("{column}{NORMALIZED_SUFFIX}");
    let mut columns = dataset.columns().to_vec();
    let replaced = dataset.has_column(&target);
    if replaced && !is_normalized_copy(dataset, column, &target) {
        return Err(DataError::precondition(format!(
            "column \"{target}\" already exists and does not hold normalized \"{column}\" values"
        )));
    }
    if !replaced {
        columns.push(target.clone());
    }

    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .map(|row| {
            let scaled = match row.get(column).and_then(CellValue::as_f64) {
                Some(_) if range == 0.0 => CellValue::text(format!("{:.4}", 0.0)),
                Some(n) => CellValue::text(format!("{:.4}", (n - min) / range)),
                None => CellValue::Null,
            };
            let mut row = row.clone();
            row.insert(target.clone(), scaled);
            row
        })
        .collect();

    let verb = if replaced { "updated" } else { "added" };
    Ok(Applied {
        dataset: Dataset::from_parts(columns, rows),
        summary: format!("Column \"{column}\" normalized ({verb} \"{target}\")"),
    })
}

/// Whether `target` has the shape an earlier normalize of `column` leaves behind:
/// a 4-decimal value in [0, 1] exactly where `column` has a value, null elsewhere.
fn is_normalized_copy(dataset: &Dataset, column: &str, target: &str) -> bool {
    dataset.rows().iter().all(|row| {
        let source_present = row.get(column).is_some_and(|v| !v.is_missing());
        match row.get(target).and_then(CellValue::as_text) {
            Some(s) if source_present => {
                let four_decimals = s.split_once('.').is_some_and(|(_, d)| d.len() == 4);
                four_decimals && parse_number(s).is_some_and(|n| (0.0..=1.0).contains(&n))
            }
            Some(s) => s.is_empty(),
            None => !source_present,
        }
    })
}

fn one_hot(dataset: &Dataset, column: &str) -> Result<Applied, DataError> {
    if !dataset.has_column(column) {
        return Err(DataError::no_such_column(column));
    }

    // Fixed before any row is touched, so every row gets the same columns.
    let mut seen = HashSet::new();
    let categories: Vec<&str> = dataset
        .present_values(column)
        .filter(|v| seen.insert(*v))
        .collect();

    let mut columns: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| c.as_str() != column)
        .cloned()
        .collect();
    let new_columns: Vec<String> = categories.iter().map(|v| format!("{column}_{v}")).collect();
    if let Some(clash) = new_columns.iter().find(|n| columns.contains(n)) {
        return Err(DataError::precondition(format!(
            "cannot one-hot encode \"{column}\": column \"{clash}\" already exists"
        )));
    }
    columns.extend(new_columns.iter().cloned());

    let rows: Vec<Row> = dataset
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            let source = row.remove(column).unwrap_or_default();
            for (name, category) in new_columns.iter().zip(&categories) {
                let hit = source.as_text() == Some(*category);
                row.insert(name.clone(), CellValue::text(if hit { "1" } else { "0" }));
            }
            row
        })
        .collect();

    Ok(Applied {
        dataset: Dataset::from_parts(columns, rows),
        summary: format!(
            "One-hot encoding applied to \"{column}\" ({} columns)",
            new_columns.len()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let rows = rows
            .iter()
            .map(|cells| {
                columns
                    .iter()
                    .zip(cells.iter())
                    .map(|(c, v)| (c.to_string(), CellValue::text(*v)))
                    .collect::<Row>()
            })
            .collect();
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    fn column(ds: &Dataset, name: &str) -> Vec<String> {
        ds.column_values(name).map(|v| v.to_string()).collect()
    }

    fn apply_ok(ds: &Dataset, t: Transform) -> Dataset {
        let out = apply(ds, &t).unwrap().dataset;
        assert!(out.is_consistent(), "{t} broke the row/column invariant");
        out
    }

    #[test]
    fn test_drop_column() {
        let ds = dataset(&["name", "age"], &[&["a", "1"], &["b", "2"]]);
        let out = apply_ok(&ds, Transform::DropColumn { column: "age".into() });
        assert_eq!(out.columns(), ["name".to_string()]);
        assert!(out.rows().iter().all(|r| !r.contains_key("age")));
        // input untouched
        assert!(ds.has_column("age"));
    }

    #[test]
    fn test_drop_absent_column_is_noop() {
        let ds = dataset(&["a"], &[&["1"]]);
        let out = apply_ok(&ds, Transform::DropColumn { column: "zzz".into() });
        assert_eq!(out, ds);
    }

    #[test]
    fn test_rename_keeps_position() {
        let ds = dataset(&["a", "b", "c"], &[&["1", "2", "3"]]);
        let out = apply_ok(
            &ds,
            Transform::RenameColumn {
                from: "b".into(),
                to: "beta".into(),
            },
        );
        assert_eq!(out.columns(), ["a", "beta", "c"].map(String::from));
        assert_eq!(column(&out, "beta"), vec!["2"]);
    }

    #[test]
    fn test_rename_collision_rejected() {
        let ds = dataset(&["a", "b"], &[&["1", "2"]]);
        let err = apply(
            &ds,
            &Transform::RenameColumn {
                from: "a".into(),
                to: "b".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DataError::PreconditionViolation(_)));
        assert_eq!(column(&ds, "a"), vec!["1"]);
    }

    #[test]
    fn test_rename_rejects_blank_and_unknown() {
        let ds = dataset(&["a"], &[&["1"]]);
        let blank = Transform::RenameColumn {
            from: "a".into(),
            to: "  ".into(),
        };
        let unknown = Transform::RenameColumn {
            from: "x".into(),
            to: "y".into(),
        };
        assert!(apply(&ds, &blank).is_err());
        assert!(apply(&ds, &unknown).is_err());
    }

    #[test]
    fn test_drop_missing_idempotent() {
        let ds = dataset(&["k", "v"], &[&["1", "x"], &["2", ""], &["3", "y"]]);
        let t = Transform::DropMissing { column: "v".into() };
        let once = apply_ok(&ds, t.clone());
        let twice = apply_ok(&once, t);
        assert_eq!(column(&once, "k"), vec!["1", "3"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_drop_missing_to_empty() {
        let ds = dataset(&["v"], &[&[""], &[""]]);
        let out = apply_ok(&ds, Transform::DropMissing { column: "v".into() });
        assert!(out.is_empty());
        assert_eq!(out.columns(), ["v".to_string()]);
    }

    #[test]
    fn test_normalize() {
        let ds = dataset(&["x"], &[&["2"], &["4"], &["6"]]);
        let out = apply_ok(&ds, Transform::Normalize { column: "x".into() });
        assert_eq!(out.columns(), ["x", "x_normalized"].map(String::from));
        assert_eq!(column(&out, "x_normalized"), vec!["0.0000", "0.5000", "1.0000"]);
    }

    #[test]
    fn test_normalize_zero_variance() {
        let ds = dataset(&["x"], &[&["5"], &["5"], &["5"]]);
        let out = apply_ok(&ds, Transform::Normalize { column: "x".into() });
        assert_eq!(column(&out, "x_normalized"), vec!["0.0000"; 3]);
    }

    #[test]
    fn test_normalize_keeps_missing_and_reapplies() {
        let ds = dataset(&["x"], &[&["0"], &[""], &["10"]]);
        let t = Transform::Normalize { column: "x".into() };
        let once = apply_ok(&ds, t.clone());
        let twice = apply_ok(&once, t);
        assert_eq!(twice.columns().len(), 2);
        assert_eq!(column(&twice, "x_normalized"), vec!["0.0000", "<null>", "1.0000"]);
    }

    #[test]
    fn test_normalize_all_missing_rejected() {
        let ds = dataset(&["x", "y"], &[&["", "1"], &["", "2"]]);
        let err = apply(&ds, &Transform::Normalize { column: "x".into() }).unwrap_err();
        assert_eq!(
            err,
            DataError::precondition("cannot normalize \"x\": it has no values")
        );
    }

    #[test]
    fn test_normalize_refuses_to_overwrite_user_column() {
        let ds = dataset(&["x", "x_normalized"], &[&["1", "keep me"], &["3", "and me"]]);
        let err = apply(&ds, &Transform::Normalize { column: "x".into() }).unwrap_err();
        assert!(matches!(err, DataError::PreconditionViolation(_)));

        // After a drop-missing elsewhere the earlier output is still recognised.
        let ds = dataset(&["x", "z"], &[&["0", "a"], &["5", ""], &["10", "b"]]);
        let t = Transform::Normalize { column: "x".into() };
        let once = apply_ok(&ds, t.clone());
        let filtered = apply_ok(&once, Transform::DropMissing { column: "z".into() });
        let again = apply_ok(&filtered, t);
        assert_eq!(column(&again, "x_normalized"), vec!["0.0000", "1.0000"]);
    }

    #[test]
    fn test_normalize_non_numeric_rejected() {
        let ds = dataset(&["x"], &[&["1"], &["abc"]]);
        let err = apply(&ds, &Transform::Normalize { column: "x".into() }).unwrap_err();
        assert!(matches!(err, DataError::PreconditionViolation(_)));
    }

    #[test]
    fn test_normalize_overflowing_range() {
        let ds = dataset(&["x"], &[&["-1e308"], &["1e308"]]);
        let err = apply(&ds, &Transform::Normalize { column: "x".into() }).unwrap_err();
        assert!(matches!(err, DataError::DegenerateData(_)));
    }

    #[test]
    fn test_one_hot() {
        let ds = dataset(&["id", "col"], &[&["1", "A"], &["2", "B"], &["3", "A"]]);
        let out = apply_ok(&ds, Transform::OneHot { column: "col".into() });
        assert_eq!(out.columns(), ["id", "col_A", "col_B"].map(String::from));
        assert_eq!(column(&out, "col_A"), vec!["1", "0", "1"]);
        assert_eq!(column(&out, "col_B"), vec!["0", "1", "0"]);
        assert!(out.rows().iter().all(|r| !r.contains_key("col")));
    }

    #[test]
    fn test_one_hot_missing_rows_are_all_zero() {
        let ds = dataset(&["c"], &[&["x"], &[""]]);
        let out = apply_ok(&ds, Transform::OneHot { column: "c".into() });
        assert_eq!(out.columns(), ["c_x".to_string()]);
        assert_eq!(column(&out, "c_x"), vec!["1", "0"]);
    }

    #[test]
    fn test_one_hot_name_clash_rejected() {
        let ds = dataset(&["c", "c_x"], &[&["x", "7"]]);
        let err = apply(&ds, &Transform::OneHot { column: "c".into() }).unwrap_err();
        assert!(matches!(err, DataError::PreconditionViolation(_)));
    }

    #[test]
    fn test_transform_serde_tag() {
        let t = Transform::RenameColumn {
            from: "a".into(),
            to: "b".into(),
        };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"type":"rename_column","from":"a","to":"b"}"#);
    }
}
