//! Post-fit regression diagnostics
//!
//! The per-variable ANOVA table, heteroscedasticity (Breusch-Pagan,
//! White), autocorrelation (Durbin-Watson), multicollinearity (VIF), and
//! the per-observation influence table. Each block is computed
//! independently; the report assembler embeds any block-level failure in
//! that block alone.

use ndarray::s;
use ndarray_linalg::LeastSquaresSvd;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use crate::lm::{Matrix, RegressionFit, Vector};
use crate::{ModelError, Result};

/// Breusch-Pagan Lagrange-multiplier test, with the F-form variant
#[derive(Debug, Clone, Copy)]
pub struct BreuschPagan {
    /// LM statistic `n R^2` of the auxiliary regression
    pub lagrange_multiplier: f64,
    /// Chi-squared p-value of the LM statistic
    pub lm_p_value: f64,
    /// Overall F of the auxiliary regression
    pub f_value: f64,
    /// p-value of the F form
    pub f_p_value: f64,
}

/// Variance inflation factor of one predictor column
#[derive(Debug, Clone)]
pub struct Vif {
    pub variable: String,
    pub vif: f64,
}

/// One row of the influence table
#[derive(Debug, Clone)]
pub struct PerObservationRow {
    /// Original dataset row index
    pub id: usize,
    pub observed: f64,
    pub predicted: f64,
    pub residual: f64,
    pub standardized_residual: f64,
    pub leverage: f64,
    pub cooks_distance: f64,
    pub outlier: bool,
}

/// One row of the per-variable regression ANOVA table
#[derive(Debug, Clone)]
pub struct AnovaTerm {
    pub variable: String,
    pub df: f64,
    pub sum_sq: f64,
    pub mean_sq: f64,
    /// None on the residual row
    pub f_statistic: Option<f64>,
    /// None on the residual row
    pub p_value: Option<f64>,
}

/// All diagnostic blocks, each independently fallible
#[derive(Debug)]
pub struct DiagnosticsReport {
    pub anova: Result<Vec<AnovaTerm>>,
    pub breusch_pagan: Result<BreuschPagan>,
    pub white: Result<BreuschPagan>,
    pub durbin_watson: Result<f64>,
    pub vif: Vec<Vif>,
    pub influence: Vec<PerObservationRow>,
}

/// Run every diagnostic block over a fit
///
/// Block failures stay inside their own slot; nothing here aborts the
/// caller.
pub fn run_all(fit: &RegressionFit) -> DiagnosticsReport {
    DiagnosticsReport {
        anova: anova_table(fit),
        breusch_pagan: breusch_pagan(&fit.x, &fit.residuals),
        white: white_test(&fit.x, &fit.residuals),
        durbin_watson: durbin_watson(&fit.residuals),
        vif: vif(&fit.x, &fit.variable_names),
        influence: influence_table(fit),
    }
}

// ==================== ANOVA Table ====================

/// Per-variable ANOVA decomposition of the fit, residual row last
///
/// Every design column past the intercept is one single-degree-of-freedom
/// term, so the partial (Type II) sum of squares reduces to `t_j^2 s^2`
/// and the term F equals the squared t-statistic.
pub fn anova_table(fit: &RegressionFit) -> Result<Vec<AnovaTerm>> {
    let df_residual = (fit.n_obs - fit.n_params) as f64;
    let sigma2 = fit.residual_std_error * fit.residual_std_error;

    let dist = FisherSnedecor::new(1.0, df_residual).map_err(|e| ModelError::Numerical {
        message: format!("failed to create F distribution: {e}"),
        operation: "anova_table".to_string(),
    })?;

    let mut rows = Vec::with_capacity(fit.n_params);
    for j in 1..fit.n_params {
        let f = fit.t_statistics[j] * fit.t_statistics[j];
        let sum_sq = f * sigma2;
        rows.push(AnovaTerm {
            variable: fit.variable_names[j].clone(),
            df: 1.0,
            sum_sq,
            mean_sq: sum_sq,
            f_statistic: Some(f),
            p_value: Some((1.0 - dist.cdf(f)).clamp(0.0, 1.0)),
        });
    }
    rows.push(AnovaTerm {
        variable: "Residual".to_string(),
        df: df_residual,
        sum_sq: sigma2 * df_residual,
        mean_sq: sigma2,
        f_statistic: None,
        p_value: None,
    });

    Ok(rows)
}

// ==================== Auxiliary Regression ====================

/// R-squared and overall F of an auxiliary OLS, used by both
/// heteroscedasticity tests
struct AuxFit {
    r_squared: f64,
    f_statistic: f64,
    f_p_value: f64,
}

fn aux_ols(x: &Matrix, y: &Vector, operation: &str) -> Result<AuxFit> {
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        return Err(ModelError::Numerical {
            message: format!("{n} observations for {p} auxiliary parameters"),
            operation: operation.to_string(),
        });
    }

    let ls = x.least_squares(y).map_err(|e| ModelError::Numerical {
        message: format!("auxiliary least squares failed: {e}"),
        operation: operation.to_string(),
    })?;
    if (ls.rank as usize) < p {
        return Err(ModelError::Numerical {
            message: "auxiliary design is rank deficient (exact collinearity)".to_string(),
            operation: operation.to_string(),
        });
    }

    let fitted = x.dot(&ls.solution);
    let residuals = y - &fitted;
    let rss = residuals.mapv(|r| r * r).sum();
    let y_mean = y.mean().unwrap_or(0.0);
    let tss = y.mapv(|yi| (yi - y_mean).powi(2)).sum();

    if tss <= f64::EPSILON {
        // Squared residuals are constant; no heteroscedasticity signal
        return Ok(AuxFit {
            r_squared: 0.0,
            f_statistic: 0.0,
            f_p_value: 1.0,
        });
    }

    let r_squared = (1.0 - rss / tss).clamp(0.0, 1.0);
    let df_model = (p - 1) as f64;
    let df_residual = (n - p) as f64;

    let (f_statistic, f_p_value) = if rss <= f64::EPSILON * tss {
        (f64::INFINITY, 0.0)
    } else {
        let f = ((tss - rss).max(0.0) / df_model) / (rss / df_residual);
        let dist =
            FisherSnedecor::new(df_model, df_residual).map_err(|e| ModelError::Numerical {
                message: format!("failed to create F distribution: {e}"),
                operation: operation.to_string(),
            })?;
        (f, 1.0 - dist.cdf(f))
    };

    Ok(AuxFit {
        r_squared,
        f_statistic,
        f_p_value,
    })
}

/// LM statistic and p-value from an auxiliary fit
fn lm_statistic(aux: &AuxFit, n: usize, df: usize, operation: &str) -> Result<(f64, f64)> {
    let lm = n as f64 * aux.r_squared;
    let chi2 = ChiSquared::new(df as f64).map_err(|e| ModelError::Numerical {
        message: format!("failed to create chi-squared distribution: {e}"),
        operation: operation.to_string(),
    })?;
    Ok((lm, (1.0 - chi2.cdf(lm)).clamp(0.0, 1.0)))
}

// ==================== Heteroscedasticity ====================

/// Breusch-Pagan test: squared residuals regressed on the original design
pub fn breusch_pagan(x: &Matrix, residuals: &Vector) -> Result<BreuschPagan> {
    let e2: Vector = residuals.mapv(|e| e * e);
    let aux = aux_ols(x, &e2, "breusch_pagan")?;
    let (lm, lm_p) = lm_statistic(&aux, x.nrows(), x.ncols() - 1, "breusch_pagan")?;

    Ok(BreuschPagan {
        lagrange_multiplier: lm,
        lm_p_value: lm_p,
        f_value: aux.f_statistic,
        f_p_value: aux.f_p_value,
    })
}

/// White test: squared residuals regressed on predictors, their squares,
/// and pairwise cross-products
///
/// The auxiliary design grows quadratically in the predictor count, so
/// this fails (softly, at the caller) for small samples or when dummies
/// make the expansion exactly collinear.
pub fn white_test(x: &Matrix, residuals: &Vector) -> Result<BreuschPagan> {
    let n = x.nrows();
    let k = x.ncols() - 1; // predictors, intercept excluded
    let p_aux = 1 + k + k * (k + 1) / 2;

    let mut aux_x = Matrix::zeros((n, p_aux));
    aux_x.column_mut(0).fill(1.0);
    for j in 0..k {
        aux_x
            .column_mut(1 + j)
            .assign(&x.slice(s![.., 1 + j]));
    }
    let mut col = 1 + k;
    for i in 0..k {
        for j in i..k {
            let product = &x.slice(s![.., 1 + i]).to_owned() * &x.slice(s![.., 1 + j]);
            aux_x.column_mut(col).assign(&product);
            col += 1;
        }
    }

    let e2: Vector = residuals.mapv(|e| e * e);
    let aux = aux_ols(&aux_x, &e2, "white_test")?;
    let (lm, lm_p) = lm_statistic(&aux, n, p_aux - 1, "white_test")?;

    Ok(BreuschPagan {
        lagrange_multiplier: lm,
        lm_p_value: lm_p,
        f_value: aux.f_statistic,
        f_p_value: aux.f_p_value,
    })
}

// ==================== Autocorrelation ====================

/// Durbin-Watson statistic over residuals in row order
pub fn durbin_watson(residuals: &Vector) -> Result<f64> {
    let n = residuals.len();
    if n < 2 {
        return Err(ModelError::Numerical {
            message: "at least 2 residuals are required".to_string(),
            operation: "durbin_watson".to_string(),
        });
    }

    let mut sum_sq_diff = 0.0;
    for i in 1..n {
        let diff = residuals[i] - residuals[i - 1];
        sum_sq_diff += diff * diff;
    }
    let sum_sq: f64 = residuals.iter().map(|&r| r * r).sum();

    if sum_sq < 1e-300 {
        return Err(ModelError::Numerical {
            message: "residuals are all zero, Durbin-Watson is undefined".to_string(),
            operation: "durbin_watson".to_string(),
        });
    }

    Ok(sum_sq_diff / sum_sq)
}

// ==================== Multicollinearity ====================

/// Variance inflation factor per predictor column (intercept excluded)
///
/// Each predictor is regressed on every other design column; perfect
/// collinearity reports `f64::INFINITY` rather than failing.
pub fn vif(x: &Matrix, variable_names: &[String]) -> Vec<Vif> {
    let n = x.nrows();
    let p = x.ncols();

    (1..p)
        .map(|j| {
            let variable = variable_names
                .get(j)
                .cloned()
                .unwrap_or_else(|| format!("x{j}"));

            let mut others = Matrix::zeros((n, p - 1));
            let mut col = 0;
            for k in (0..p).filter(|&k| k != j) {
                others.column_mut(col).assign(&x.slice(s![.., k]));
                col += 1;
            }
            let target: Vector = x.slice(s![.., j]).to_owned();

            Vif {
                variable,
                vif: vif_from_aux(&others, &target),
            }
        })
        .collect()
}

fn vif_from_aux(others: &Matrix, target: &Vector) -> f64 {
    // SVD least squares tolerates a rank-deficient "others" block; only
    // the achieved R^2 matters here
    let ls = match others.least_squares(target) {
        Ok(ls) => ls,
        Err(_) => return f64::NAN,
    };
    let fitted = others.dot(&ls.solution);
    let residuals = target - &fitted;
    let rss = residuals.mapv(|r| r * r).sum();
    let mean = target.mean().unwrap_or(0.0);
    let tss = target.mapv(|t| (t - mean).powi(2)).sum();

    if tss <= f64::EPSILON {
        // Constant predictor: collinear with the intercept
        return f64::INFINITY;
    }

    let r_squared = (1.0 - rss / tss).clamp(0.0, 1.0);
    if 1.0 - r_squared < 1e-12 {
        f64::INFINITY
    } else {
        1.0 / (1.0 - r_squared)
    }
}

// ==================== Influence ====================

/// Per-observation influence table in preserved row order
pub fn influence_table(fit: &RegressionFit) -> Vec<PerObservationRow> {
    (0..fit.n_obs)
        .map(|i| PerObservationRow {
            id: fit.row_indices[i],
            observed: fit.y[i],
            predicted: fit.fitted_values[i],
            residual: fit.residuals[i],
            standardized_residual: fit.standardized_residuals[i],
            leverage: fit.hat_diagonal[i],
            cooks_distance: fit.cooks_distance[i],
            outlier: fit.outliers[i],
        })
        .collect()
}
