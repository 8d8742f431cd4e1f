//! Report assembly and wire contracts
//!
//! Deserializes analysis requests, drives the engines, and serializes the
//! response objects the frontend consumes. Field names follow the
//! established JSON contract, including the statsmodels-style
//! Breusch-Pagan keys and the Spanish influence-table columns. Structural
//! errors become `{ok: false, error}`; per-diagnostic failures are
//! embedded in their own block. Numeric values are rounded to 4 decimals
//! on the wire.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sv_core::data::{Cell, TabularDataset};
use sv_core::describe;

use crate::anova::{self, DEFAULT_ALPHA};
use crate::lm::{self, diagnostics, normality, DesignMatrix, RegressionFit};
use crate::Result;

// ==================== Requests ====================

/// ANOVA request body: `{columns, data}`
#[derive(Debug, Clone, Deserialize)]
pub struct AnovaRequest {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Cell>>,
}

/// Regression request body: `{columns, data, dependent?, categorical?}`
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionRequest {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Cell>>,
    /// Dependent column name; the wire default matches the frontend
    #[serde(default = "default_dependent")]
    pub dependent: String,
    /// Predictor names to force-encode as categorical
    #[serde(default)]
    pub categorical: Vec<String>,
}

fn default_dependent() -> String {
    "salario".to_string()
}

// ==================== Responses ====================

/// Failure envelope shared by both endpoints
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    fn new(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: error.to_string(),
        }
    }
}

/// Either a successful report or the `{ok: false, error}` envelope
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse<T> {
    Ok(T),
    Err(ErrorResponse),
}

impl<T> AnalysisResponse<T> {
    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(report) => AnalysisResponse::Ok(report),
            Err(e) => {
                warn!(error = %e, "analysis request failed");
                AnalysisResponse::Err(ErrorResponse::new(e))
            }
        }
    }
}

/// One-way ANOVA response
#[derive(Debug, Serialize)]
pub struct AnovaReport {
    pub ok: bool,
    pub f_statistics: f64,
    pub p_value: f64,
    pub conclusion: String,
    pub means: Vec<f64>,
    pub global_mean: f64,
    pub n_data: usize,
    pub k_groups: usize,
    pub ssb: Vec<f64>,
    pub sse: Vec<f64>,
    pub sse_string: Vec<String>,
    pub ssb_string: Vec<String>,
    pub ssb_total: f64,
    pub sse_total: f64,
    pub mse: f64,
    pub msb: f64,
}

/// Coefficient entry of the regression response
#[derive(Debug, Serialize)]
pub struct CoefEntry {
    pub variable: String,
    pub coef: f64,
    pub p_value: f64,
}

/// One entry of the per-variable ANOVA table
#[derive(Debug, Serialize)]
pub struct AnovaTermBlock {
    pub df: f64,
    pub sum_sq: f64,
    pub mean_sq: f64,
    #[serde(rename = "F")]
    pub f: Option<f64>,
    #[serde(rename = "PR(>F)")]
    pub p: Option<f64>,
}

/// ANOVA table keyed by variable name, or its embedded failure
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnovaTableBlock {
    Table(std::collections::BTreeMap<String, AnovaTermBlock>),
    Failed { error: String },
}

/// Normality block
#[derive(Debug, Serialize)]
pub struct NormalityBlock {
    pub shapiro_stat: f64,
    pub shapiro_p: f64,
    pub ks_stat: f64,
    pub ks_p: f64,
    pub jarque_bera_stat: f64,
    pub jarque_bera_p: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Breusch-Pagan block with its statsmodels-style key names
#[derive(Debug, Serialize)]
pub struct BreuschPaganBlock {
    #[serde(rename = "Lagrange multiplier")]
    pub lagrange_multiplier: f64,
    #[serde(rename = "p-value")]
    pub p_value: f64,
    #[serde(rename = "f-value")]
    pub f_value: f64,
    #[serde(rename = "f p-value")]
    pub f_p_value: f64,
    #[serde(rename = "LM_p")]
    pub lm_p: f64,
    #[serde(rename = "F_p")]
    pub f_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// White test block
#[derive(Debug, Serialize)]
pub struct WhiteBlock {
    pub stat: f64,
    pub p_value: f64,
    pub f_stat: f64,
    pub f_p_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// VIF entry
#[derive(Debug, Serialize)]
pub struct VifEntry {
    pub variable: String,
    #[serde(rename = "VIF")]
    pub vif: f64,
}

/// One row of the per-observation results table
#[derive(Debug, Serialize)]
pub struct ResultsRow {
    pub id: usize,
    #[serde(rename = "Y_observado")]
    pub y_observed: f64,
    #[serde(rename = "Y_predicho")]
    pub y_predicted: f64,
    #[serde(rename = "Residuo")]
    pub residual: f64,
    #[serde(rename = "Residuo_estandarizado")]
    pub standardized_residual: f64,
    #[serde(rename = "Leverage")]
    pub leverage: f64,
    #[serde(rename = "Cooks_distance")]
    pub cooks_distance: f64,
    #[serde(rename = "Outlier")]
    pub outlier: bool,
}

/// Multiple linear regression response
#[derive(Debug, Serialize)]
pub struct RegressionReport {
    pub ok: bool,
    pub n_obs: usize,
    pub n_vars: usize,
    pub r2: f64,
    pub r2_adj: f64,
    pub f_statistic: f64,
    pub f_pvalue: f64,
    pub coefs: Vec<CoefEntry>,
    pub anova: AnovaTableBlock,
    pub normality: NormalityBlock,
    pub breusch_pagan: BreuschPaganBlock,
    pub white_test: WhiteBlock,
    pub durbin_watson: f64,
    pub vif: Vec<VifEntry>,
    pub cooks_distance: Vec<f64>,
    pub conclusion: String,
    pub interpretacion: String,
    pub results_table: Vec<ResultsRow>,
}

// ==================== Entry Points ====================

/// Run the one-way ANOVA pipeline for a request
pub fn run_anova(request: &AnovaRequest) -> AnalysisResponse<AnovaReport> {
    AnalysisResponse::from_result(anova_report(request))
}

/// Run the regression pipeline for a request
pub fn run_regression(request: &RegressionRequest) -> AnalysisResponse<RegressionReport> {
    AnalysisResponse::from_result(regression_report(request))
}

fn anova_report(request: &AnovaRequest) -> Result<AnovaReport> {
    let dataset = TabularDataset::new(request.columns.clone(), request.data.clone())?;
    let summary = anova::one_way(&dataset, DEFAULT_ALPHA)?;

    debug!(k_groups = summary.k_groups, "assembling ANOVA report");

    Ok(AnovaReport {
        ok: true,
        f_statistics: round4(summary.f_statistic),
        p_value: round4(summary.p_value),
        conclusion: summary.conclusion,
        means: summary.groups.iter().map(|g| round4(g.mean)).collect(),
        global_mean: round4(summary.grand_mean),
        n_data: summary.n_total,
        k_groups: summary.k_groups,
        ssb: round4_vec(&summary.ssb),
        sse: round4_vec(&summary.sse),
        sse_string: summary.sse_strings,
        ssb_string: summary.ssb_strings,
        ssb_total: round4(summary.ssb_total),
        sse_total: round4(summary.sse_total),
        mse: round4(summary.mse),
        msb: round4(summary.msb),
    })
}

fn regression_report(request: &RegressionRequest) -> Result<RegressionReport> {
    let dataset = TabularDataset::new(request.columns.clone(), request.data.clone())?;
    let design = DesignMatrix::build(&dataset, &request.dependent, &request.categorical)?;
    let fit = lm::ols::fit(&design)?;
    let diag = diagnostics::run_all(&fit);

    debug!(
        n_obs = fit.n_obs,
        n_params = fit.n_params,
        "assembling regression report"
    );

    let residuals = fit.residuals.to_vec();
    let anova = anova_table_block(diag.anova);
    let normality = normality_block(&residuals);
    let breusch_pagan = breusch_pagan_block(diag.breusch_pagan);
    let white_test = white_block(diag.white);
    let durbin_watson = match diag.durbin_watson {
        Ok(dw) => round4(dw),
        Err(e) => {
            warn!(error = %e, "Durbin-Watson unavailable");
            f64::NAN
        }
    };

    let coefs: Vec<CoefEntry> = fit
        .variable_names
        .iter()
        .zip(fit.coefficients.iter())
        .zip(fit.p_values.iter())
        .map(|((name, &coef), &p)| CoefEntry {
            variable: name.clone(),
            coef: round4(coef),
            p_value: round4(p),
        })
        .collect();

    let vif: Vec<VifEntry> = diag
        .vif
        .iter()
        .map(|v| VifEntry {
            variable: v.variable.clone(),
            vif: round4(v.vif),
        })
        .collect();

    let results_table: Vec<ResultsRow> = diag
        .influence
        .iter()
        .map(|row| ResultsRow {
            id: row.id,
            y_observed: round4(row.observed),
            y_predicted: round4(row.predicted),
            residual: round4(row.residual),
            standardized_residual: round4(row.standardized_residual),
            leverage: round4(row.leverage),
            cooks_distance: round4(row.cooks_distance),
            outlier: row.outlier,
        })
        .collect();

    let conclusion = if fit.f_p_value < DEFAULT_ALPHA {
        "Reject H0: the model is significant.".to_string()
    } else {
        "Fail to reject H0: the model is not significant.".to_string()
    };

    let interpretacion = interpret(
        &fit,
        &coefs,
        &normality,
        &breusch_pagan,
        &white_test,
        durbin_watson,
        &vif,
        &results_table,
        &conclusion,
    );

    Ok(RegressionReport {
        ok: true,
        n_obs: fit.n_obs,
        n_vars: fit.n_params - 1,
        r2: round4(fit.r_squared),
        r2_adj: round4(fit.adj_r_squared),
        f_statistic: round4(fit.f_statistic),
        f_pvalue: round4(fit.f_p_value),
        coefs,
        anova,
        normality,
        breusch_pagan,
        white_test,
        durbin_watson,
        vif,
        cooks_distance: round4_vec(&fit.cooks_distance.to_vec()),
        conclusion,
        interpretacion,
        results_table,
    })
}

// ==================== Block Assembly ====================

fn anova_table_block(result: Result<Vec<diagnostics::AnovaTerm>>) -> AnovaTableBlock {
    match result {
        Ok(terms) => AnovaTableBlock::Table(
            terms
                .into_iter()
                .map(|t| {
                    (
                        t.variable,
                        AnovaTermBlock {
                            df: t.df,
                            sum_sq: round4(t.sum_sq),
                            mean_sq: round4(t.mean_sq),
                            f: t.f_statistic.map(round4),
                            p: t.p_value.map(round4),
                        },
                    )
                })
                .collect(),
        ),
        Err(e) => {
            warn!(error = %e, "ANOVA table unavailable");
            AnovaTableBlock::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn normality_block(residuals: &[f64]) -> NormalityBlock {
    let mut errors: Vec<String> = Vec::new();

    let (shapiro_stat, shapiro_p) = match normality::shapiro_wilk(residuals) {
        Ok(t) => (round4(t.statistic), round4(t.p_value)),
        Err(e) => {
            warn!(error = %e, "Shapiro-Wilk unavailable");
            errors.push(e.to_string());
            (f64::NAN, f64::NAN)
        }
    };

    let (ks_stat, ks_p) = match normality::kolmogorov_smirnov(residuals) {
        Ok(t) => (round4(t.statistic), round4(t.p_value)),
        Err(e) => {
            warn!(error = %e, "Kolmogorov-Smirnov unavailable");
            errors.push(e.to_string());
            (f64::NAN, f64::NAN)
        }
    };

    let (jb_stat, jb_p, skewness, kurtosis) = match normality::jarque_bera(residuals) {
        Ok(t) => (
            round4(t.statistic),
            round4(t.p_value),
            round4(t.skewness),
            round4(t.kurtosis),
        ),
        Err(e) => {
            warn!(error = %e, "Jarque-Bera unavailable");
            errors.push(e.to_string());
            (
                f64::NAN,
                f64::NAN,
                round4(describe::skewness(residuals)),
                round4(describe::kurtosis(residuals)),
            )
        }
    };

    NormalityBlock {
        shapiro_stat,
        shapiro_p,
        ks_stat,
        ks_p,
        jarque_bera_stat: jb_stat,
        jarque_bera_p: jb_p,
        skewness,
        kurtosis,
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        },
    }
}

fn breusch_pagan_block(result: Result<diagnostics::BreuschPagan>) -> BreuschPaganBlock {
    match result {
        Ok(bp) => BreuschPaganBlock {
            lagrange_multiplier: round4(bp.lagrange_multiplier),
            p_value: round4(bp.lm_p_value),
            f_value: round4(bp.f_value),
            f_p_value: round4(bp.f_p_value),
            lm_p: round4(bp.lm_p_value),
            f_p: round4(bp.f_p_value),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Breusch-Pagan unavailable");
            BreuschPaganBlock {
                lagrange_multiplier: f64::NAN,
                p_value: f64::NAN,
                f_value: f64::NAN,
                f_p_value: f64::NAN,
                lm_p: f64::NAN,
                f_p: f64::NAN,
                error: Some(e.to_string()),
            }
        }
    }
}

fn white_block(result: Result<diagnostics::BreuschPagan>) -> WhiteBlock {
    match result {
        Ok(w) => WhiteBlock {
            stat: round4(w.lagrange_multiplier),
            p_value: round4(w.lm_p_value),
            f_stat: round4(w.f_value),
            f_p_value: round4(w.f_p_value),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "White test unavailable");
            WhiteBlock {
                stat: f64::NAN,
                p_value: f64::NAN,
                f_stat: f64::NAN,
                f_p_value: f64::NAN,
                error: Some(e.to_string()),
            }
        }
    }
}

// ==================== Interpretation ====================

/// Deterministic rule-based reading of the full result set
#[allow(clippy::too_many_arguments)]
fn interpret(
    fit: &RegressionFit,
    coefs: &[CoefEntry],
    normality: &NormalityBlock,
    bp: &BreuschPaganBlock,
    white: &WhiteBlock,
    durbin_watson: f64,
    vif: &[VifEntry],
    results_table: &[ResultsRow],
    conclusion: &str,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    // Model fit
    let r2_pct = fit.r_squared * 100.0;
    let strength = if fit.r_squared < 0.3 {
        "a weak"
    } else if fit.r_squared < 0.7 {
        "a moderate"
    } else {
        "a strong"
    };
    sections.push(format!(
        "Model fit\nR² of {r2_pct:.1}% indicates {strength} fit: the predictors explain \
         {r2_pct:.1}% of the variance of the dependent variable (adjusted R² {:.4}).",
        fit.adj_r_squared
    ));

    // Overall significance
    sections.push(format!(
        "Model significance\nF = {:.4} with p-value {:.4}. {conclusion}",
        fit.f_statistic, fit.f_p_value
    ));

    // Coefficients
    let significant: Vec<&CoefEntry> = coefs
        .iter()
        .skip(1)
        .filter(|c| c.p_value < DEFAULT_ALPHA)
        .collect();
    if significant.is_empty() {
        sections.push(
            "Coefficients\nNo predictor is significant at the 5% level; the model has no \
             usable reduced form."
                .to_string(),
        );
    } else {
        let names: Vec<String> = significant.iter().map(|c| c.variable.clone()).collect();
        let mut equation = format!("Y = {:.4}", coefs[0].coef);
        for c in &significant {
            equation.push_str(&format!(" + {:.4}*{}", c.coef, c.variable));
        }
        sections.push(format!(
            "Coefficients\nSignificant predictors (p < 0.05): {}. Reduced model: {equation}.",
            names.join(", ")
        ));
    }

    // Normality
    let normality_verdict = if normality.shapiro_p.is_nan() {
        "The Shapiro-Wilk test could not be computed.".to_string()
    } else if normality.shapiro_p < DEFAULT_ALPHA {
        format!(
            "Residuals deviate from normality (Shapiro-Wilk p = {:.4}); inference on small \
             samples may be unreliable.",
            normality.shapiro_p
        )
    } else {
        format!(
            "Residuals are compatible with normality (Shapiro-Wilk p = {:.4}).",
            normality.shapiro_p
        )
    };
    sections.push(format!("Normality of residuals\n{normality_verdict}"));

    // Heteroscedasticity
    let bp_suspect = bp.p_value < DEFAULT_ALPHA;
    let white_suspect = white.p_value < DEFAULT_ALPHA;
    let hetero_verdict = if bp.error.is_some() && white.error.is_some() {
        "Neither heteroscedasticity test could be computed.".to_string()
    } else if bp_suspect || white_suspect {
        format!(
            "Heteroscedasticity is suspected (Breusch-Pagan p = {:.4}, White p = {:.4}); \
             consider robust standard errors.",
            bp.p_value, white.p_value
        )
    } else {
        "No evidence of heteroscedasticity at the 5% level.".to_string()
    };
    sections.push(format!("Heteroscedasticity\n{hetero_verdict}"));

    // Autocorrelation
    let dw_verdict = if durbin_watson.is_nan() {
        "The Durbin-Watson statistic could not be computed.".to_string()
    } else if durbin_watson < 1.5 {
        format!("Durbin-Watson = {durbin_watson:.4} suggests positive autocorrelation.")
    } else if durbin_watson > 2.5 {
        format!("Durbin-Watson = {durbin_watson:.4} suggests negative autocorrelation.")
    } else {
        format!("Durbin-Watson = {durbin_watson:.4} is close to 2: no autocorrelation concern.")
    };
    sections.push(format!("Autocorrelation\n{dw_verdict}"));

    // Multicollinearity
    let inflated: Vec<&VifEntry> = vif.iter().filter(|v| v.vif > 10.0).collect();
    let vif_verdict = if inflated.is_empty() {
        "All VIF values are below 10: no multicollinearity concern.".to_string()
    } else {
        let names: Vec<String> = inflated.iter().map(|v| v.variable.clone()).collect();
        format!(
            "High multicollinearity (VIF > 10) for: {}. Consider dropping or combining \
             these predictors.",
            names.join(", ")
        )
    };
    sections.push(format!("Multicollinearity\n{vif_verdict}"));

    // Influential observations
    let outlier_count = results_table.iter().filter(|r| r.outlier).count();
    let influence_verdict = if outlier_count == 0 {
        "No observation exceeds the standardized-residual threshold of |2|.".to_string()
    } else {
        format!(
            "{outlier_count} observation(s) exceed the standardized-residual threshold of \
             |2|; inspect them in the results table."
        )
    };
    sections.push(format!("Influential observations\n{influence_verdict}"));

    sections.join("\n\n")
}

// ==================== Rounding ====================

/// Round a value to 4 decimals, passing non-finite values through
fn round4(v: f64) -> f64 {
    if v.is_finite() {
        (v * 10_000.0).round() / 10_000.0
    } else {
        v
    }
}

fn round4_vec(values: &[f64]) -> Vec<f64> {
    values.iter().map(|&v| round4(v)).collect()
}

// ==================== Tests ====================
