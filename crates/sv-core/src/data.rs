//! Tabular dataset model
//!
//! A `TabularDataset` is the validated rectangular input both analyses
//! consume: named columns over rows of loosely-typed cells. Type coercion
//! happens here, at the edge, so the numeric code never sees raw JSON.

mod cell;
mod dataset;


// Re-exports
pub use cell::Cell;
pub use dataset::{ColumnKind, TabularDataset};

// Type aliases for common use cases
pub type FloatArray = ndarray::Array1<f64>;
pub type Matrix = ndarray::Array2<f64>;

/// Error types specific to data validation and access
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("Dataset is empty: at least one row and one column are required")]
    EmptyDataset,

    #[error("Row {row} has {actual} cells, expected {expected}")]
    ShapeMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column '{0}' has no numeric values")]
    NonNumericColumn(String),
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, DataError>;
