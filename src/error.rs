use std::path::PathBuf;
use thiserror::Error;

/// Domain failures raised by the analyses. Callers usually wrap these in
/// `anyhow::Error` with extra context.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid path provided or file is not a valid type for the chosen method, '{suffix}' files are required by {operation}: {path}")]
    InvalidInput {
        operation: String,
        suffix: String,
        path: PathBuf,
    },

    #[error("Not an existing file: {0}")]
    NotAFile(PathBuf),

    #[error("Output path must be an existing directory: {0}")]
    InvalidOutputDir(PathBuf),

    #[error("{path}:{line}: expected {expected} tab-separated columns, found {found}")]
    ColumnCount {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path}:{line}: invalid integer '{value}' in column '{column}'")]
    InvalidNumber {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },

    #[error("Malformed attribute field (no '\"' delimiter): '{0}'")]
    MalformedAttribute(String),

    #[error("Column '{0}' not found in interval table")]
    MissingColumn(String),

    #[error("Request failed for {id}: {message}")]
    Request { id: String, message: String },
}
