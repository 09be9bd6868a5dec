//! Error types for the transformation engine.
//!
//! This module provides structured error types for command table parsing,
//! parameter validation, and stream generation.

use std::io;
use thiserror::Error;
use tunekit_core::{MalformedInputError, ValidationError};

/// Errors that can occur while transforming a command table.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A safety bound was violated before any output was produced.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Input data is structurally unusable.
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] MalformedInputError),

    /// Command table text could not be parsed.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// A parameter file could not be read or written.
    #[error("Parameter file error: {0}")]
    ParameterFile(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Errors related to command table text parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// A row does not have the expected number of columns.
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based source line number.
        line: usize,
        /// Columns required by the table contract.
        expected: usize,
        /// Columns actually present.
        found: usize,
    },

    /// A cell is not a readable number.
    #[error("Line {line}: invalid number '{token}'")]
    InvalidNumber {
        /// 1-based source line number.
        line: usize,
        /// The offending cell text.
        token: String,
    },

    /// The directive-code column is not a small non-negative integer.
    #[error("Line {line}: invalid directive code '{token}'")]
    InvalidCode {
        /// 1-based source line number.
        line: usize,
        /// The offending cell text.
        token: String,
    },
}

/// Result type alias for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;
