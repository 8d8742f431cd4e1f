//! Model-related error types

use thiserror::Error;

use sv_core::data::DataError;

/// Model-related errors
///
/// Structural and precondition failures abort the whole request; the report
/// assembler surfaces them as `{ok: false, error}`. Per-diagnostic failures
/// never reach this type; they are embedded in their own response block.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Data validation or access error
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// ANOVA preconditions unmet
    #[error("Insufficient data: {reason}")]
    InsufficientData {
        /// What was missing
        reason: String,
    },

    /// Zero within-group variance with non-zero between-group variance
    #[error("Degenerate variance: within-group variance is zero, F is undefined")]
    DegenerateVariance,

    /// Fewer complete observations than the regression minimum
    #[error("Too few observations: {n_obs} complete rows, at least {min} required")]
    TooFewObservations {
        /// Complete observations available
        n_obs: usize,
        /// Required minimum
        min: usize,
    },

    /// More parameters than observations
    #[error("Underdetermined model: {n_obs} observations for {n_params} parameters")]
    Underdetermined {
        /// Number of observations
        n_obs: usize,
        /// Number of design-matrix columns
        n_params: usize,
    },

    /// Design matrix is not full column rank
    #[error("Rank-deficient design matrix: rank {rank} < {n_params} parameters (collinear or duplicate predictors)")]
    RankDeficiency {
        /// Numerical rank of the design
        rank: usize,
        /// Number of design-matrix columns
        n_params: usize,
    },

    /// No independent variables left after removing the dependent column
    #[error("No predictor variables available")]
    NoPredictors,

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    Numerical {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },
}
