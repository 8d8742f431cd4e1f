//! One-way ANOVA
//!
//! Each dataset column is one independent group. The engine computes the
//! full between/within sum-of-squares decomposition, the F test, and a
//! textual conclusion, along with per-group derivation strings the frontend
//! renders as tooltips.

mod engine;


pub use engine::one_way;

/// Significance level for the hypothesis test
pub const DEFAULT_ALPHA: f64 = 0.05;

/// One group of observations (one dataset column)
#[derive(Debug, Clone)]
pub struct GroupSample {
    /// Column name
    pub name: String,
    /// Non-missing numeric values, in row order
    pub values: Vec<f64>,
    /// Observation count
    pub n: usize,
    /// Group mean
    pub mean: f64,
}

/// Complete one-way ANOVA decomposition
///
/// Invariants: `sse_total + ssb_total` equals the total sum of squares of
/// the pooled data (1e-6 relative), `df_between = k - 1`,
/// `df_within = n_total - k`.
#[derive(Debug, Clone)]
pub struct AnovaSummary {
    /// Groups that entered the analysis, in column order
    pub groups: Vec<GroupSample>,
    /// Pooled mean of all observations
    pub grand_mean: f64,
    /// Total observations across groups
    pub n_total: usize,
    /// Number of groups
    pub k_groups: usize,
    /// Per-group between-group component `n_g (mean_g - grand)^2`
    pub ssb: Vec<f64>,
    /// Per-group within-group component `Σ (x - mean_g)^2`
    pub sse: Vec<f64>,
    /// Human-readable derivation of each `ssb` entry
    pub ssb_strings: Vec<String>,
    /// Human-readable derivation of each `sse` entry
    pub sse_strings: Vec<String>,
    pub ssb_total: f64,
    pub sse_total: f64,
    pub df_between: usize,
    pub df_within: usize,
    /// Mean square between: `ssb_total / df_between`
    pub msb: f64,
    /// Mean square within: `sse_total / df_within`
    pub mse: f64,
    pub f_statistic: f64,
    pub p_value: f64,
    /// Reject / fail-to-reject statement at [`DEFAULT_ALPHA`]
    pub conclusion: String,
}
