use thiserror::Error;

// ---------------------------------------------------------------------------
// DataError – every failure the data layer reports to the UI
// ---------------------------------------------------------------------------

/// Errors raised by ingestion, inference, transforms and hosted-model analysis.
///
/// None of these are fatal: the session turns them into a notification and
/// keeps the previous dataset snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    /// Unparseable file or ill-shaped table.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Operation requested on a column or value that does not satisfy it.
    #[error("{0}")]
    PreconditionViolation(String),

    /// Network, API or response-parse failure of the hosted model.
    #[error("analysis failed: {0}")]
    ExternalCallFailure(String),

    /// Numeric data whose range cannot be represented.
    #[error("degenerate data: {0}")]
    DegenerateData(String),
}

impl DataError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionViolation(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalCallFailure(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateData(msg.into())
    }

    /// Shorthand for the most common precondition failure.
    pub fn no_such_column(column: &str) -> Self {
        Self::PreconditionViolation(format!("column \"{column}\" does not exist"))
    }
}
