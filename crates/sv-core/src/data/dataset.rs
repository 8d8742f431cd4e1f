//! Validated rectangular dataset
//!
//! Column names are unique and keep insertion order; that order defines
//! variable identity and the ordering of every downstream result.

use std::collections::HashSet;

use super::{Cell, DataError, FloatArray, Result};

/// Inferred role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-missing cell is numeric
    Numeric,
    /// At least one non-missing cell is non-numeric text
    Categorical,
}

/// A validated rectangular dataset of named columns
#[derive(Debug, Clone)]
pub struct TabularDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl TabularDataset {
    /// Validate shape and build a dataset
    ///
    /// Every row must have exactly one cell per column; ragged input is a
    /// `ShapeMismatch`, an empty table an `EmptyDataset`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if columns.is_empty() || rows.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(DataError::DuplicateColumn(name.clone()));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataError::ShapeMismatch {
                    row: i,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    /// Iterate the cells of one column in row order
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Non-missing numeric values of a column, in row order
    ///
    /// Text cells are skipped along with missing ones; callers that need
    /// strict numeric columns should check `column_kind` first.
    pub fn numeric_column(&self, col: usize) -> FloatArray {
        self.column(col).filter_map(Cell::as_number).collect()
    }

    /// Non-missing numeric values of a column looked up by name
    pub fn numeric_column_by_name(&self, name: &str) -> Result<FloatArray> {
        let idx = self.column_index(name)?;
        let values = self.numeric_column(idx);
        if values.is_empty() {
            return Err(DataError::NonNumericColumn(name.to_string()));
        }
        Ok(values)
    }

    /// Infer whether a column is numeric or categorical
    pub fn column_kind(&self, col: usize) -> ColumnKind {
        let has_text = self.column(col).any(|c| matches!(c, Cell::Text(_)));
        if has_text {
            ColumnKind::Categorical
        } else {
            ColumnKind::Numeric
        }
    }

    /// Row indices where every listed column has a usable value
    ///
    /// A cell is usable when it is numeric, or any non-missing value for a
    /// column flagged categorical. `cols` and `categorical` run in parallel.
    pub fn complete_cases(&self, cols: &[usize], categorical: &[bool]) -> Vec<usize> {
        debug_assert_eq!(cols.len(), categorical.len());

        (0..self.rows.len())
            .filter(|&i| {
                cols.iter().zip(categorical.iter()).all(|(&c, &is_cat)| {
                    let cell = &self.rows[i][c];
                    if is_cat {
                        !cell.is_missing()
                    } else {
                        cell.as_number().is_some()
                    }
                })
            })
            .collect()
    }
}
