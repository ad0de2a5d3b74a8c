//! Error types for cogbias

use thiserror::Error;

/// Errors that can occur while loading, scoring or writing reports
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column '{column}' for task {task}")]
    MissingColumn { task: String, column: String },

    #[error("Input table has no header row")]
    EmptyTable,

    #[error("No trial data available")]
    NoTrialData,

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Report error: {0}")]
    ReportError(String),
}
