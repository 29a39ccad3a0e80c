use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A cell as it sits in the table: raw text or nothing.
///
/// Numeric columns keep their data as text; callers go through
/// [`CellValue::as_f64`] instead of trusting whatever the source format did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    #[default]
    Null,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// `Null` and the empty string are both missing.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Text(s) => s.is_empty(),
            CellValue::Null => true,
        }
    }

    /// The text of a non-missing cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Parse the cell as a finite decimal number.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_text().and_then(parse_number)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

/// Locale-agnostic numeric parse used by inference, stats and transforms.
///
/// `inf` and `NaN` parse as `f64` but are not finite, so they are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Row – one record of the table
// ---------------------------------------------------------------------------

/// Column name → cell.
pub type Row = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// Dataset – an immutable snapshot of the table
// ---------------------------------------------------------------------------

/// Rows plus the ordered column list, kept in lockstep.
///
/// Every row holds exactly the keys in `columns`. Snapshots are never edited in
/// place; transforms build a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a snapshot, validating the column list and filling absent keys with `Null`.
    ///
    /// Fails when a column name is repeated or empty, or when a row carries a key
    /// that is not in the column list.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, DataError> {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if col.is_empty() {
                return Err(DataError::malformed("empty column name"));
            }
            if !seen.insert(col.as_str()) {
                return Err(DataError::malformed(format!("duplicate column \"{col}\"")));
            }
        }

        let mut filled = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            if let Some(extra) = row.keys().find(|k| !seen.contains(k.as_str())) {
                return Err(DataError::malformed(format!(
                    "row {i} has column \"{extra}\" which is not in the header"
                )));
            }
            for col in &columns {
                row.entry(col.clone()).or_insert(CellValue::Null);
            }
            filled.push(row);
        }

        Ok(Dataset {
            columns,
            rows: filled,
        })
    }

    /// Assemble a snapshot the caller has already shaped correctly.
    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let ds = Dataset { columns, rows };
        debug_assert!(ds.is_consistent(), "row shape out of sync with column list");
        ds
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column in row order. Yields nothing for an unknown column.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        let known = self.has_column(name);
        self.rows
            .iter()
            .filter(move |_| known)
            .map(move |row| row.get(name).unwrap_or(&CellValue::Null))
    }

    /// Non-missing text of one column in row order.
    pub fn present_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.column_values(name).filter_map(CellValue::as_text)
    }

    /// Rows of a 1-based page. Out-of-range pages are empty.
    pub fn page(&self, page: usize, per_page: usize) -> &[Row] {
        if page == 0 || per_page == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(per_page);
        if start >= self.rows.len() {
            return &[];
        }
        let end = (start + per_page).min(self.rows.len());
        &self.rows[start..end]
    }

    /// Number of pages needed to show every row (at least one).
    pub fn page_count(&self, per_page: usize) -> usize {
        if per_page == 0 {
            return 1;
        }
        self.rows.len().div_ceil(per_page).max(1)
    }

    /// Every row has exactly the listed keys and the list has no duplicates.
    pub fn is_consistent(&self) -> bool {
        let set: BTreeSet<&str> = self.columns.iter().map(String::as_str).collect();
        if set.len() != self.columns.len() {
            return false;
        }
        self.rows
            .iter()
            .all(|row| row.len() == set.len() && row.keys().all(|k| set.contains(k.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::text(*v)))
            .collect()
    }

    #[test]
    fn test_missing_cells() {
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::text("").is_missing());
        assert!(!CellValue::text("0").is_missing());
        assert_eq!(CellValue::text("").as_text(), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("-1e3"), Some(-1000.0));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_new_fills_absent_keys() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![row(&[("a", "1")]), row(&[("a", "2"), ("b", "x")])],
        )
        .unwrap();
        assert!(ds.is_consistent());
        assert_eq!(ds.rows()[0].get("b"), Some(&CellValue::Null));
    }

    #[test]
    fn test_new_rejects_duplicates_and_strays() {
        let dup = Dataset::new(vec!["a".into(), "a".into()], vec![]);
        assert!(matches!(dup, Err(DataError::MalformedInput(_))));

        let stray = Dataset::new(vec!["a".into()], vec![row(&[("z", "1")])]);
        assert!(matches!(stray, Err(DataError::MalformedInput(_))));
    }

    #[test]
    fn test_column_values_unknown_column() {
        let ds = Dataset::new(vec!["a".into()], vec![row(&[("a", "1")])]).unwrap();
        assert_eq!(ds.column_values("missing").count(), 0);
        assert_eq!(ds.present_values("a").collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn test_pagination() {
        let rows = (0..25).map(|i| row(&[("n", &i.to_string())])).collect();
        let ds = Dataset::new(vec!["n".into()], rows).unwrap();
        assert_eq!(ds.page_count(10), 3);
        assert_eq!(ds.page(1, 10).len(), 10);
        assert_eq!(ds.page(3, 10).len(), 5);
        assert!(ds.page(4, 10).is_empty());
        assert!(ds.page(0, 10).is_empty());
        assert_eq!(Dataset::default().page_count(10), 1);
    }
}
