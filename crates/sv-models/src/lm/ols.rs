//! Ordinary least squares fit
//!
//! The solve goes through SVD least squares rather than a direct inversion
//! of X'X; the SVD also yields the numerical rank, which drives the
//! rank-deficiency check. Covariance-based quantities (standard errors,
//! leverage) still need (X'X)^{-1}, computed once after the design is
//! known to be full rank.

use ndarray_linalg::{Inverse, LeastSquaresSvd};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::debug;

use crate::lm::{DesignMatrix, Matrix, Vector, OUTLIER_THRESHOLD};
use crate::{ModelError, Result};

/// Fitted OLS model with everything the diagnostics need
///
/// Residuals and fitted values stay in the retained-row order of the
/// design; `row_indices` maps them back to the source dataset.
#[derive(Debug, Clone)]
pub struct RegressionFit {
    /// Coefficients, one per design column
    pub coefficients: Vector,
    /// Standard errors
    pub standard_errors: Vector,
    /// t-statistics
    pub t_statistics: Vector,
    /// Two-tailed p-values
    pub p_values: Vector,
    /// Fitted values
    pub fitted_values: Vector,
    /// Raw residuals
    pub residuals: Vector,
    /// Hat matrix diagonal (leverage)
    pub hat_diagonal: Vector,
    /// Internally studentized residuals `e_i / (s sqrt(1 - h_i))`
    pub standardized_residuals: Vector,
    /// Cook's distances
    pub cooks_distance: Vector,
    /// `|standardized residual| > OUTLIER_THRESHOLD`
    pub outliers: Vec<bool>,
    /// Design matrix (intercept first)
    pub x: Matrix,
    /// Response vector
    pub y: Vector,
    /// One name per design column
    pub variable_names: Vec<String>,
    /// Original dataset row per observation
    pub row_indices: Vec<usize>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Residual standard error `sqrt(RSS / (n - p))`
    pub residual_std_error: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub n_obs: usize,
    pub n_params: usize,
}

/// Fit the model described by a design matrix
pub fn fit(design: &DesignMatrix) -> Result<RegressionFit> {
    let n = design.n_obs();
    let p = design.n_params();

    if n <= p {
        return Err(ModelError::Underdetermined {
            n_obs: n,
            n_params: p,
        });
    }

    let ls = design
        .x
        .least_squares(&design.y)
        .map_err(|e| ModelError::Numerical {
            message: format!("SVD least squares failed: {e}"),
            operation: "fit".to_string(),
        })?;

    let rank = ls.rank as usize;
    if rank < p {
        return Err(ModelError::RankDeficiency { rank, n_params: p });
    }
    let coefficients = ls.solution;

    let fitted_values = design.x.dot(&coefficients);
    let residuals = &design.y - &fitted_values;

    let rss = residuals.mapv(|r| r * r).sum();
    let y_mean = design.y.mean().unwrap_or(0.0);
    let tss = design.y.mapv(|yi| (yi - y_mean).powi(2)).sum();

    // A perfect fit reports exactly 1 rather than 1 minus float noise
    let r_squared = if tss <= f64::EPSILON {
        1.0
    } else if rss <= 1e-12 * tss {
        1.0
    } else {
        1.0 - rss / tss
    };
    let nf = n as f64;
    let pf = p as f64;
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / (nf - pf);

    let sigma2 = rss / (nf - pf);
    let residual_std_error = sigma2.sqrt();

    let xtx_inv = xtx_inverse(&design.x)?;
    let standard_errors: Vector = xtx_inv.diag().mapv(|v| (v * sigma2).sqrt().max(1e-10));

    let (t_statistics, p_values) = inference(&coefficients, &standard_errors, n, p)?;
    let (f_statistic, f_p_value) = overall_f(rss, tss, n, p)?;

    let hat_diagonal = hat_diagonal(&design.x, &xtx_inv);
    let standardized_residuals: Vector = residuals
        .iter()
        .zip(hat_diagonal.iter())
        .map(|(&e, &h)| e / (residual_std_error.max(1e-10) * (1.0 - h).max(1e-12).sqrt()))
        .collect();
    let cooks_distance: Vector = standardized_residuals
        .iter()
        .zip(hat_diagonal.iter())
        .map(|(&r, &h)| (r * r / pf) * (h / (1.0 - h).max(1e-12)))
        .collect();
    let outliers: Vec<bool> = standardized_residuals
        .iter()
        .map(|&r| r.abs() > OUTLIER_THRESHOLD)
        .collect();

    debug!(n_obs = n, n_params = p, r_squared, f_statistic, "OLS fit complete");

    Ok(RegressionFit {
        coefficients,
        standard_errors,
        t_statistics,
        p_values,
        fitted_values,
        residuals,
        hat_diagonal,
        standardized_residuals,
        cooks_distance,
        outliers,
        x: design.x.clone(),
        y: design.y.clone(),
        variable_names: design.variable_names.clone(),
        row_indices: design.row_indices.clone(),
        r_squared,
        adj_r_squared,
        residual_std_error,
        f_statistic,
        f_p_value,
        n_obs: n,
        n_params: p,
    })
}

/// (X'X)^{-1} for covariance work; the rank check has already passed
fn xtx_inverse(x: &Matrix) -> Result<Matrix> {
    let xtx = x.t().dot(x);
    xtx.inv().map_err(|e| ModelError::Numerical {
        message: format!("failed to invert X'X: {e}"),
        operation: "xtx_inverse".to_string(),
    })
}

/// t-statistics and two-tailed p-values with n - p degrees of freedom
fn inference(
    coefficients: &Vector,
    standard_errors: &Vector,
    n: usize,
    p: usize,
) -> Result<(Vector, Vector)> {
    let df = (n - p) as f64;
    let t_dist = StudentsT::new(0.0, 1.0, df).map_err(|e| ModelError::Numerical {
        message: format!("failed to create t-distribution: {e}"),
        operation: "inference".to_string(),
    })?;

    let t_statistics: Vector = coefficients
        .iter()
        .zip(standard_errors.iter())
        .map(|(&coef, &se)| coef / se)
        .collect();

    let p_values: Vector = t_statistics
        .iter()
        .map(|&t| (2.0 * (1.0 - t_dist.cdf(t.abs()))).clamp(0.0, 1.0))
        .collect();

    Ok((t_statistics, p_values))
}

/// Overall model F test against the intercept-only model
fn overall_f(rss: f64, tss: f64, n: usize, p: usize) -> Result<(f64, f64)> {
    let df_model = (p - 1) as f64;
    let df_residual = (n - p) as f64;
    let ess = (tss - rss).max(0.0);

    if rss <= f64::EPSILON * tss.max(1.0) {
        // Perfect fit: unbounded F, p-value 0
        return Ok((f64::INFINITY, 0.0));
    }

    let f_statistic = (ess / df_model) / (rss / df_residual);
    let dist = FisherSnedecor::new(df_model, df_residual).map_err(|e| ModelError::Numerical {
        message: format!("failed to create F distribution: {e}"),
        operation: "overall_f".to_string(),
    })?;

    Ok((f_statistic, 1.0 - dist.cdf(f_statistic)))
}

/// Diagonal of the hat matrix H = X (X'X)^{-1} X'
fn hat_diagonal(x: &Matrix, xtx_inv: &Matrix) -> Vector {
    let mut hat = Vector::zeros(x.nrows());
    for i in 0..x.nrows() {
        let xi = x.row(i);
        hat[i] = xi.dot(xtx_inv).dot(&xi.t());
    }
    hat
}
