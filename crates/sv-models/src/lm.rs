//! Multiple linear regression with diagnostics
//!
//! The pipeline runs design-matrix construction ([`design`]), the OLS fit
//! ([`ols`]), and the post-fit diagnostics ([`diagnostics`], [`normality`]).
//! Residual and row ordering is preserved end to end; Durbin-Watson depends
//! on it.

pub mod design;
pub mod diagnostics;
pub mod normality;
pub mod ols;

#[cfg(test)]
mod tests;

// Re-exports
pub use design::DesignMatrix;
pub use diagnostics::{AnovaTerm, BreuschPagan, DiagnosticsReport, PerObservationRow, Vif};
pub use ols::RegressionFit;

// Common types
use ndarray::{Array1, Array2};

/// Matrix type alias for 2D arrays
pub type Matrix = Array2<f64>;

/// Vector type alias for 1D arrays
pub type Vector = Array1<f64>;

/// Standardized-residual magnitude beyond which an observation is flagged
/// as an outlier
pub const OUTLIER_THRESHOLD: f64 = 2.0;

/// Minimum complete observations for a fit
pub const MIN_OBSERVATIONS: usize = 5;

/// Name given to the intercept column
pub const INTERCEPT_NAME: &str = "const";
