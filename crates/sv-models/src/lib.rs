//! Statistical analysis engines for StatSolver
//!
//! Two independent pipelines over a [`sv_core::data::TabularDataset`]:
//!
//! - [`anova`]: one-way ANOVA with the full sum-of-squares decomposition.
//! - [`lm`]: multiple linear regression (OLS) with a battery of
//!   diagnostics: normality, heteroscedasticity, autocorrelation,
//!   multicollinearity, and per-observation influence.
//!
//! [`report`] turns either result into the serializable response objects
//! the frontend consumes. Every computation is stateless and reentrant; a
//! request either yields a deterministic result or a deterministic error.

pub mod anova;
pub mod error;
pub mod lm;
pub mod report;

pub use error::ModelError;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
