use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::model::{Dataset, Row};
use crate::analysis::VariableAnalysis;
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Feature / target selection
// ---------------------------------------------------------------------------

/// Which columns feed the model (features) and which one it predicts (target).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSelection {
    pub features: Vec<String>,
    pub target: String,
}

impl FeatureSelection {
    /// Take the hosted model's suggestion: independent → features, first dependent → target.
    pub fn from_variables(analysis: &VariableAnalysis) -> Result<Self, DataError> {
        let target = analysis
            .dependent
            .first()
            .cloned()
            .ok_or_else(|| DataError::precondition("analysis suggested no target column"))?;
        Ok(FeatureSelection {
            features: analysis.independent.clone(),
            target,
        })
    }

    /// Check the selection against the current column list.
    pub fn validate(&self, dataset: &Dataset) -> Result<(), DataError> {
        if self.features.is_empty() {
            return Err(DataError::precondition("select at least one feature column"));
        }
        if self.target.is_empty() {
            return Err(DataError::precondition("select a target column"));
        }
        for name in self.features.iter().chain(std::iter::once(&self.target)) {
            if !dataset.has_column(name) {
                return Err(DataError::no_such_column(name));
            }
        }
        if self.features.contains(&self.target) {
            return Err(DataError::precondition(format!(
                "\"{}\" cannot be both a feature and the target",
                self.target
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Training hand-off
// ---------------------------------------------------------------------------

/// Everything the training collaborator receives. It does its own numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingInput {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub features: Vec<String>,
    pub target: String,
}

impl TrainingInput {
    pub fn new(dataset: &Dataset, selection: &FeatureSelection) -> Result<Self, DataError> {
        selection.validate(dataset)?;
        Ok(TrainingInput {
            columns: dataset.columns().to_vec(),
            rows: dataset.rows().to_vec(),
            features: selection.features.clone(),
            target: selection.target.clone(),
        })
    }

    /// Write the hand-off as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing training input")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing training input to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn dataset() -> Dataset {
        let row: Row = ["a", "b", "y"]
            .iter()
            .map(|c| (c.to_string(), CellValue::text("1")))
            .collect();
        Dataset::new(vec!["a".into(), "b".into(), "y".into()], vec![row]).unwrap()
    }

    fn selection(features: &[&str], target: &str) -> FeatureSelection {
        FeatureSelection {
            features: features.iter().map(|s| s.to_string()).collect(),
            target: target.to_string(),
        }
    }

    #[test]
    fn test_valid_selection() {
        assert!(selection(&["a", "b"], "y").validate(&dataset()).is_ok());
    }

    #[test]
    fn test_rejects_unknown_and_overlap() {
        let ds = dataset();
        assert!(selection(&["a", "zzz"], "y").validate(&ds).is_err());
        assert!(selection(&["a"], "nope").validate(&ds).is_err());
        assert!(selection(&["a", "y"], "y").validate(&ds).is_err());
        assert!(selection(&[], "y").validate(&ds).is_err());
    }

    #[test]
    fn test_from_variables_needs_a_target() {
        let analysis = VariableAnalysis {
            dependent: vec![],
            independent: vec!["a".into()],
            remove: vec![],
        };
        assert!(FeatureSelection::from_variables(&analysis).is_err());

        let analysis = VariableAnalysis {
            dependent: vec!["y".into(), "b".into()],
            independent: vec!["a".into()],
            remove: vec![],
        };
        assert_eq!(
            FeatureSelection::from_variables(&analysis).unwrap(),
            selection(&["a"], "y")
        );
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handoff.json");
        let input = TrainingInput::new(&dataset(), &selection(&["a"], "y")).unwrap();
        input.save(&path).unwrap();

        let back: TrainingInput =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.target, "y");
        assert_eq!(back.rows[0].get("a"), Some(&CellValue::text("1")));
    }
}
