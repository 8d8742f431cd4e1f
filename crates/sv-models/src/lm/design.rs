//! Design matrix construction
//!
//! Numeric predictors pass through; categorical predictors expand to
//! indicator columns with the first category observed in row order as the
//! reference level. The reference choice affects coefficient
//! interpretation, not fit quality. An intercept column of ones comes
//! first.

use std::collections::HashSet;

use sv_core::data::{ColumnKind, TabularDataset};

use crate::lm::{Matrix, Vector, INTERCEPT_NAME, MIN_OBSERVATIONS};
use crate::{ModelError, Result};

/// One predictor column of the source dataset
#[derive(Debug, Clone)]
struct Predictor {
    name: String,
    col: usize,
    categorical: bool,
    /// Category levels in observed order (reference first); empty for
    /// numeric predictors
    levels: Vec<String>,
}

/// Numeric design matrix with response vector and provenance
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// Intercept column plus encoded predictors
    pub x: Matrix,
    /// Response values
    pub y: Vector,
    /// One name per design column: `const`, numeric names, `var[level]`
    pub variable_names: Vec<String>,
    /// Original dataset row index of each retained observation
    pub row_indices: Vec<usize>,
}

impl DesignMatrix {
    /// Build the design for `dependent ~ all other columns`
    ///
    /// `categorical` flags predictors by name; non-numeric columns are
    /// inferred categorical regardless. Rows with a missing value in any
    /// used column are dropped (listwise deletion); surviving rows keep
    /// their original indices.
    pub fn build(
        dataset: &TabularDataset,
        dependent: &str,
        categorical: &[String],
    ) -> Result<Self> {
        let dep_col = dataset.column_index(dependent)?;
        let flagged: HashSet<&str> = categorical.iter().map(String::as_str).collect();

        let predictors: Vec<Predictor> = dataset
            .columns()
            .iter()
            .enumerate()
            .filter(|&(col, _)| col != dep_col)
            .map(|(col, name)| Predictor {
                name: name.clone(),
                col,
                categorical: flagged.contains(name.as_str())
                    || dataset.column_kind(col) == ColumnKind::Categorical,
                levels: Vec::new(),
            })
            .collect();

        if predictors.is_empty() {
            return Err(ModelError::NoPredictors);
        }

        // Listwise deletion over the dependent plus every predictor
        let mut cols = vec![dep_col];
        let mut cat_mask = vec![false];
        for p in &predictors {
            cols.push(p.col);
            cat_mask.push(p.categorical);
        }
        let rows = dataset.complete_cases(&cols, &cat_mask);

        let n = rows.len();
        if n < MIN_OBSERVATIONS {
            return Err(ModelError::TooFewObservations {
                n_obs: n,
                min: MIN_OBSERVATIONS,
            });
        }

        let predictors = resolve_levels(dataset, predictors, &rows);

        // const + numeric columns + (levels - 1) dummies per categorical
        let p: usize = 1 + predictors
            .iter()
            .map(|pr| {
                if pr.categorical {
                    pr.levels.len().saturating_sub(1)
                } else {
                    1
                }
            })
            .sum::<usize>();

        // Single-level categoricals contribute no columns; the model needs
        // at least one real predictor next to the intercept
        if p < 2 {
            return Err(ModelError::NoPredictors);
        }

        let mut x = Matrix::zeros((n, p));
        let mut variable_names = Vec::with_capacity(p);

        x.column_mut(0).fill(1.0);
        variable_names.push(INTERCEPT_NAME.to_string());

        let mut col_idx = 1;
        for pr in &predictors {
            if pr.categorical {
                // Reference level (index 0) is dropped
                for level in &pr.levels[1..] {
                    for (i, &row) in rows.iter().enumerate() {
                        let label = dataset
                            .cell(row, pr.col)
                            .category_label()
                            .unwrap_or_default();
                        x[(i, col_idx)] = if label == *level { 1.0 } else { 0.0 };
                    }
                    variable_names.push(format!("{}[{}]", pr.name, level));
                    col_idx += 1;
                }
            } else {
                for (i, &row) in rows.iter().enumerate() {
                    // complete_cases guarantees a numeric value here
                    x[(i, col_idx)] = dataset.cell(row, pr.col).as_number().unwrap_or(f64::NAN);
                }
                variable_names.push(pr.name.clone());
                col_idx += 1;
            }
        }

        let y: Vector = rows
            .iter()
            .map(|&row| dataset.cell(row, dep_col).as_number().unwrap_or(f64::NAN))
            .collect();

        Ok(Self {
            x,
            y,
            variable_names,
            row_indices: rows,
        })
    }

    pub fn n_obs(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.x.ncols()
    }
}

/// Collect category levels in observed row order for each categorical
/// predictor
fn resolve_levels(
    dataset: &TabularDataset,
    mut predictors: Vec<Predictor>,
    rows: &[usize],
) -> Vec<Predictor> {
    for pr in predictors.iter_mut().filter(|p| p.categorical) {
        let mut seen = HashSet::new();
        for &row in rows {
            if let Some(label) = dataset.cell(row, pr.col).category_label() {
                if seen.insert(label.clone()) {
                    pr.levels.push(label);
                }
            }
        }
    }
    predictors
}
