//! Hosted-model analysis: column descriptions and feature/target suggestions.
//!
//! The model is an opaque text-in/text-out collaborator. Prompts embed a small
//! sample of the dataset, and the reply must be JSON of the requested shape;
//! anything else fails the call. Nothing is retried.

pub mod gemini;
pub mod prompt;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::Dataset;
use crate::error::DataError;

pub use gemini::GeminiClient;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a call to the hosted model failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("API key not configured (set {0})")]
    MissingKey(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("reply is not the requested JSON: {0}")]
    Parse(String),
}

impl From<AnalysisError> for DataError {
    fn from(e: AnalysisError) -> Self {
        DataError::ExternalCallFailure(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Generator seam
// ---------------------------------------------------------------------------

/// Anything that turns a prompt into a single text reply.
///
/// Implementations block; callers run them off the UI thread.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError>;
}

// ---------------------------------------------------------------------------
// Reply shapes
// ---------------------------------------------------------------------------

/// Reply to a single-column analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInsight {
    pub description: String,
    #[serde(rename = "mlUse")]
    pub ml_use: String,
    pub preprocessing: Preprocessing,
}

/// The model may answer with one sentence or a list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Preprocessing {
    Text(String),
    Steps(Vec<String>),
}

impl fmt::Display for Preprocessing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preprocessing::Text(s) => f.write_str(s),
            Preprocessing::Steps(steps) => f.write_str(&steps.join("; ")),
        }
    }
}

/// Reply to a whole-dataset feature/target suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableAnalysis {
    /// Likely targets.
    pub dependent: Vec<String>,
    /// Likely features.
    pub independent: Vec<String>,
    /// Columns the model suggests dropping.
    #[serde(default)]
    pub remove: Vec<String>,
}

/// Parse a reply strictly: the whole payload must be the requested JSON.
pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T, AnalysisError> {
    serde_json::from_str(text.trim()).map_err(|e| AnalysisError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Ask the model what a column represents and how to preprocess it.
pub fn analyze_column(
    generator: &dyn TextGenerator,
    dataset: &Dataset,
    column: &str,
    sample_rows: usize,
) -> Result<ColumnInsight, DataError> {
    if !dataset.has_column(column) {
        return Err(DataError::no_such_column(column));
    }
    let prompt = prompt::column_prompt(dataset, column, sample_rows);
    log::debug!("column analysis for \"{column}\" ({} prompt bytes)", prompt.len());

    let reply = generator.generate(&prompt)?;
    Ok(parse_reply(&reply)?)
}

/// Ask the model which columns look like targets and which like features.
pub fn analyze_variables(
    generator: &dyn TextGenerator,
    dataset: &Dataset,
    sample_rows: usize,
) -> Result<VariableAnalysis, DataError> {
    if dataset.columns().is_empty() {
        return Err(DataError::precondition("dataset has no columns"));
    }
    let prompt = prompt::variable_prompt(dataset, sample_rows);
    log::debug!("variable analysis ({} prompt bytes)", prompt.len());

    let reply = generator.generate(&prompt)?;
    Ok(parse_reply(&reply)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::loader::parse_csv;
    use std::sync::Mutex;

    /// Replies with a canned answer and records the prompts it saw.
    pub(crate) struct FakeGenerator {
        reply: Result<String, AnalysisError>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        pub(crate) fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(err: AnalysisError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for FakeGenerator {
        fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn dataset() -> Dataset {
        parse_csv(b"age,city,price\n31,Oslo,100\n45,Bergen,250\n").unwrap()
    }

    #[test]
    fn test_analyze_column_parses_reply() {
        let fake = FakeGenerator::replying(
            r#"{"description": "Age in years", "mlUse": "feature", "preprocessing": ["scale"]}"#,
        );
        let insight = analyze_column(&fake, &dataset(), "age", 100).unwrap();
        assert_eq!(insight.description, "Age in years");
        assert_eq!(insight.preprocessing.to_string(), "scale");
        assert!(fake.prompts.lock().unwrap()[0].contains("\"age\""));
    }

    #[test]
    fn test_non_json_reply_is_external_failure() {
        let fake = FakeGenerator::replying("Sure! Here is the analysis: ...");
        let err = analyze_column(&fake, &dataset(), "age", 100).unwrap_err();
        assert!(matches!(err, DataError::ExternalCallFailure(_)));
    }

    #[test]
    fn test_wrong_shape_is_external_failure() {
        let fake = FakeGenerator::replying(r#"{"targets": ["price"]}"#);
        let err = analyze_variables(&fake, &dataset(), 5).unwrap_err();
        assert!(matches!(err, DataError::ExternalCallFailure(_)));
    }

    #[test]
    fn test_transport_failure_propagates() {
        let fake = FakeGenerator::failing(AnalysisError::Network("connection reset".into()));
        let err = analyze_variables(&fake, &dataset(), 5).unwrap_err();
        assert_eq!(
            err,
            DataError::ExternalCallFailure("network error: connection reset".into())
        );
    }

    #[test]
    fn test_analyze_variables_optional_remove() {
        let fake =
            FakeGenerator::replying(r#"{"dependent": ["price"], "independent": ["age", "city"]}"#);
        let analysis = analyze_variables(&fake, &dataset(), 5).unwrap();
        assert_eq!(analysis.dependent, vec!["price"]);
        assert!(analysis.remove.is_empty());
    }

    #[test]
    fn test_unknown_column_never_calls_model() {
        let fake = FakeGenerator::replying("{}");
        assert!(analyze_column(&fake, &dataset(), "nope", 100).is_err());
        assert!(fake.prompts.lock().unwrap().is_empty());
    }
}
