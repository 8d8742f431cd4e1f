//! Tests for the regression pipeline: design, fit, and diagnostics

use approx::assert_abs_diff_eq;
use ndarray::array;

use sv_core::data::{Cell, TabularDataset};

use crate::lm::{
    design::DesignMatrix,
    diagnostics::{self, durbin_watson, vif},
    normality::{jarque_bera, kolmogorov_smirnov, shapiro_wilk},
    ols, Vector, INTERCEPT_NAME,
};
use crate::ModelError;

// ==================== Test Fixtures ====================

fn dataset(columns: &[&str], rows: Vec<Vec<Cell>>) -> TabularDataset {
    TabularDataset::new(columns.iter().map(|&c| c.to_string()).collect(), rows).unwrap()
}

fn numeric_dataset(columns: &[&str], rows: &[&[f64]]) -> TabularDataset {
    dataset(
        columns,
        rows.iter()
            .map(|row| row.iter().map(|&v| Cell::from(v)).collect())
            .collect(),
    )
}

/// Exact line y = 1 + 2x over x = 1..6
fn exact_line() -> TabularDataset {
    numeric_dataset(
        &["x", "y"],
        &[
            &[1.0, 3.0],
            &[2.0, 5.0],
            &[3.0, 7.0],
            &[4.0, 9.0],
            &[5.0, 11.0],
            &[6.0, 13.0],
        ],
    )
}

/// Two predictors with small additive noise around y = 1 + 2 x1 + 0.5 x2
fn noisy_plane() -> TabularDataset {
    numeric_dataset(
        &["x1", "x2", "y"],
        &[
            &[1.0, 2.0, 6.1],
            &[2.0, 1.0, 7.4],
            &[3.0, 4.0, 11.0],
            &[4.0, 3.0, 12.4],
            &[5.0, 6.0, 16.1],
            &[6.0, 5.0, 17.3],
            &[7.0, 8.0, 21.0],
            &[8.0, 7.0, 22.5],
        ],
    )
}

fn fit(ds: &TabularDataset, dependent: &str) -> crate::lm::RegressionFit {
    let design = DesignMatrix::build(ds, dependent, &[]).unwrap();
    ols::fit(&design).unwrap()
}

// ==================== Design Matrix ====================

#[test]
fn test_design_numeric_predictors() {
    let design = DesignMatrix::build(&noisy_plane(), "y", &[]).unwrap();

    assert_eq!(design.n_obs(), 8);
    assert_eq!(design.n_params(), 3);
    assert_eq!(design.variable_names, vec![INTERCEPT_NAME, "x1", "x2"]);
    assert_eq!(design.row_indices, vec![0, 1, 2, 3, 4, 5, 6, 7]);

    // Intercept column of ones, predictors copied through
    for i in 0..8 {
        assert_abs_diff_eq!(design.x[(i, 0)], 1.0, epsilon = 1e-15);
    }
    assert_abs_diff_eq!(design.x[(2, 1)], 3.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(2, 2)], 4.0, epsilon = 1e-15);
}

#[test]
fn test_design_categorical_drops_first_level() {
    let ds = dataset(
        &["edad", "ciudad", "salario"],
        vec![
            vec![Cell::from(25.0), Cell::Text("A".into()), Cell::from(1.0)],
            vec![Cell::from(30.0), Cell::Text("B".into()), Cell::from(2.0)],
            vec![Cell::from(35.0), Cell::Text("A".into()), Cell::from(3.0)],
            vec![Cell::from(40.0), Cell::Text("C".into()), Cell::from(4.0)],
            vec![Cell::from(45.0), Cell::Text("B".into()), Cell::from(5.0)],
            vec![Cell::from(50.0), Cell::Text("A".into()), Cell::from(6.0)],
        ],
    );
    let design = DesignMatrix::build(&ds, "salario", &[]).unwrap();

    // "A" is seen first, so it is the reference level
    assert_eq!(
        design.variable_names,
        vec![INTERCEPT_NAME, "edad", "ciudad[B]", "ciudad[C]"]
    );

    // Row 1 is "B", row 3 is "C", row 0 is the reference
    assert_abs_diff_eq!(design.x[(1, 2)], 1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(1, 3)], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(3, 2)], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(3, 3)], 1.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(0, 2)], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(design.x[(0, 3)], 0.0, epsilon = 1e-15);
}

#[test]
fn test_design_listwise_deletion_preserves_indices() {
    let ds = dataset(
        &["x", "y"],
        vec![
            vec![Cell::from(1.0), Cell::from(3.0)],
            vec![Cell::Missing, Cell::from(5.0)],
            vec![Cell::from(3.0), Cell::from(7.0)],
            vec![Cell::from(4.0), Cell::Missing],
            vec![Cell::from(5.0), Cell::from(11.0)],
            vec![Cell::from(6.0), Cell::from(13.0)],
            vec![Cell::from(7.0), Cell::from(15.0)],
        ],
    );
    let design = DesignMatrix::build(&ds, "y", &[]).unwrap();

    assert_eq!(design.row_indices, vec![0, 2, 4, 5, 6]);
    assert_eq!(design.n_obs(), 5);
}

#[test]
fn test_design_too_few_observations() {
    let ds = numeric_dataset(
        &["x", "y"],
        &[&[1.0, 2.0], &[2.0, 4.0], &[3.0, 6.0], &[4.0, 8.0]],
    );
    let err = DesignMatrix::build(&ds, "y", &[]).unwrap_err();
    assert!(matches!(
        err,
        ModelError::TooFewObservations { n_obs: 4, min: 5 }
    ));
}

#[test]
fn test_design_missing_dependent_column() {
    let err = DesignMatrix::build(&exact_line(), "nope", &[]).unwrap_err();
    assert!(matches!(err, ModelError::Data(_)));
}

// ==================== OLS Fit ====================

#[test]
fn test_fit_exact_line() {
    let fit = fit(&exact_line(), "y");

    assert_abs_diff_eq!(fit.coefficients[0], 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 1e-8);
    assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-12);
    assert_eq!(fit.f_statistic, f64::INFINITY);
    assert_abs_diff_eq!(fit.f_p_value, 0.0, epsilon = 1e-15);
    assert!(fit.outliers.iter().all(|&o| !o));
}

#[test]
fn test_fit_recovers_plane_coefficients() {
    let fit = fit(&noisy_plane(), "y");

    assert_eq!(fit.n_obs, 8);
    assert_eq!(fit.n_params, 3);
    assert_abs_diff_eq!(fit.coefficients[0], 1.0, epsilon = 0.3);
    assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 0.2);
    assert_abs_diff_eq!(fit.coefficients[2], 0.5, epsilon = 0.2);

    assert!(fit.r_squared > 0.99);
    assert!(fit.adj_r_squared <= fit.r_squared);
    assert!(fit.f_p_value < 0.001);

    // Residuals of a model with intercept sum to zero
    let residual_sum: f64 = fit.residuals.iter().sum();
    assert_abs_diff_eq!(residual_sum, 0.0, epsilon = 1e-8);
}

#[test]
fn test_fit_collinear_predictors_rejected() {
    // x2 = 2 x1 exactly
    let ds = numeric_dataset(
        &["x1", "x2", "y"],
        &[
            &[1.0, 2.0, 3.1],
            &[2.0, 4.0, 5.9],
            &[3.0, 6.0, 9.2],
            &[4.0, 8.0, 11.8],
            &[5.0, 10.0, 15.1],
            &[6.0, 12.0, 18.2],
        ],
    );
    let design = DesignMatrix::build(&ds, "y", &[]).unwrap();
    let err = ols::fit(&design).unwrap_err();
    assert!(matches!(err, ModelError::RankDeficiency { rank: 2, n_params: 3 }));
}

#[test]
fn test_fit_underdetermined() {
    // 5 rows, 4 predictors plus intercept: n == p
    let ds = numeric_dataset(
        &["a", "b", "c", "d", "y"],
        &[
            &[1.0, 5.0, 2.0, 7.0, 1.0],
            &[2.0, 3.0, 8.0, 1.0, 2.0],
            &[4.0, 9.0, 1.0, 3.0, 3.0],
            &[8.0, 2.0, 5.0, 9.0, 4.0],
            &[3.0, 7.0, 4.0, 2.0, 5.0],
        ],
    );
    let design = DesignMatrix::build(&ds, "y", &[]).unwrap();
    let err = ols::fit(&design).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Underdetermined { n_obs: 5, n_params: 5 }
    ));
}

#[test]
fn test_fit_inference_shapes() {
    let fit = fit(&noisy_plane(), "y");

    assert_eq!(fit.standard_errors.len(), 3);
    assert_eq!(fit.t_statistics.len(), 3);
    assert_eq!(fit.p_values.len(), 3);
    assert!(fit.standard_errors.iter().all(|&se| se > 0.0));
    assert!(fit.p_values.iter().all(|&p| (0.0..=1.0).contains(&p)));

    // Slopes are strongly significant in this fixture
    assert!(fit.p_values[1] < 0.01);
}

#[test]
fn test_fit_deterministic() {
    let first = fit(&noisy_plane(), "y");
    let second = fit(&noisy_plane(), "y");

    assert_eq!(first.r_squared.to_bits(), second.r_squared.to_bits());
    assert_eq!(first.f_statistic.to_bits(), second.f_statistic.to_bits());
    for (a, b) in first.coefficients.iter().zip(second.coefficients.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

// ==================== ANOVA Table ====================

#[test]
fn test_anova_table_terms_match_t_tests() {
    let fit = fit(&noisy_plane(), "y");
    let table = diagnostics::anova_table(&fit).unwrap();

    // One term per predictor plus the residual row, in design order
    assert_eq!(table.len(), 3);
    assert_eq!(table[0].variable, "x1");
    assert_eq!(table[1].variable, "x2");
    assert_eq!(table[2].variable, "Residual");

    let sigma2 = fit.residual_std_error * fit.residual_std_error;
    for (j, term) in table.iter().take(2).enumerate() {
        let t = fit.t_statistics[j + 1];
        assert_abs_diff_eq!(term.df, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(term.f_statistic.unwrap(), t * t, epsilon = 1e-9);
        assert_abs_diff_eq!(term.sum_sq, t * t * sigma2, epsilon = 1e-9);
        assert_abs_diff_eq!(term.mean_sq, term.sum_sq, epsilon = 1e-15);
        // A single-df F test is the two-sided t test
        assert_abs_diff_eq!(term.p_value.unwrap(), fit.p_values[j + 1], epsilon = 1e-9);
    }

    let residual = &table[2];
    assert_abs_diff_eq!(residual.df, 5.0, epsilon = 1e-15);
    assert_abs_diff_eq!(residual.mean_sq, sigma2, epsilon = 1e-12);
    assert_abs_diff_eq!(residual.sum_sq, sigma2 * 5.0, epsilon = 1e-12);
    assert!(residual.f_statistic.is_none());
    assert!(residual.p_value.is_none());
}

// ==================== Normality ====================

#[test]
fn test_shapiro_wilk_n3_exact() {
    // W = (5 / sqrt(2))^2 / 14
    let result = shapiro_wilk(&[0.0, 1.0, 5.0]).unwrap();
    assert_abs_diff_eq!(result.statistic, 12.5 / 14.0, epsilon = 1e-12);
    assert!(result.p_value > 0.0 && result.p_value < 1.0);
}

#[test]
fn test_shapiro_wilk_symmetric_sample() {
    let data = [-2.0, -1.0, -0.5, 0.0, 0.0, 0.5, 1.0, 2.0];
    let result = shapiro_wilk(&data).unwrap();

    assert!(result.statistic > 0.8 && result.statistic <= 1.0);
    assert!(result.p_value > 0.01);
}

#[test]
fn test_shapiro_wilk_rejects_degenerate_input() {
    assert!(matches!(
        shapiro_wilk(&[1.0, 2.0]).unwrap_err(),
        ModelError::Numerical { .. }
    ));
    assert!(matches!(
        shapiro_wilk(&[3.0, 3.0, 3.0, 3.0]).unwrap_err(),
        ModelError::Numerical { .. }
    ));
}

#[test]
fn test_kolmogorov_smirnov_bounds() {
    let data = [-1.3, -0.7, -0.2, 0.1, 0.4, 0.9, 1.5, 2.1];
    let result = kolmogorov_smirnov(&data).unwrap();

    assert!(result.statistic > 0.0 && result.statistic < 1.0);
    assert!(result.p_value > 0.0 && result.p_value <= 1.0);
}

#[test]
fn test_kolmogorov_smirnov_zero_variance() {
    let err = kolmogorov_smirnov(&[2.0, 2.0, 2.0, 2.0]).unwrap_err();
    assert!(matches!(err, ModelError::Numerical { .. }));
}

#[test]
fn test_jarque_bera_symmetric_sample() {
    // Skewness 0, Pearson kurtosis 1.7: JB = 5/6 * (1.3^2 / 4)
    let result = jarque_bera(&[-2.0, -1.0, 0.0, 1.0, 2.0]).unwrap();

    assert_abs_diff_eq!(result.skewness, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(result.kurtosis, 1.7, epsilon = 1e-12);
    assert_abs_diff_eq!(result.statistic, 5.0 / 6.0 * 0.4225, epsilon = 1e-9);
    assert_abs_diff_eq!(
        result.p_value,
        (-result.statistic / 2.0).exp(),
        epsilon = 1e-9
    );
}

#[test]
fn test_jarque_bera_minimum_size() {
    let err = jarque_bera(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, ModelError::Numerical { .. }));
}

// ==================== Heteroscedasticity ====================

#[test]
fn test_breusch_pagan_homoscedastic_fixture() {
    let fit = fit(&noisy_plane(), "y");
    let bp = diagnostics::breusch_pagan(&fit.x, &fit.residuals).unwrap();

    assert!(bp.lagrange_multiplier >= 0.0);
    assert!((0.0..=1.0).contains(&bp.lm_p_value));
    assert!((0.0..=1.0).contains(&bp.f_p_value));
    // Constant-magnitude noise gives no heteroscedasticity signal
    assert!(bp.lm_p_value > 0.05);
}

#[test]
fn test_white_test_runs_on_adequate_sample() {
    let fit = fit(&noisy_plane(), "y");
    // 2 predictors expand to 6 auxiliary columns; n = 8 is enough
    let white = diagnostics::white_test(&fit.x, &fit.residuals).unwrap();

    assert!(white.lagrange_multiplier >= 0.0);
    assert!((0.0..=1.0).contains(&white.lm_p_value));
}

#[test]
fn test_white_test_soft_failure_on_small_sample() {
    // n = 5 with 2 predictors: the fit works, but the quadratic
    // expansion needs more than 6 rows
    let ds = numeric_dataset(
        &["x1", "x2", "y"],
        &[
            &[1.0, 2.0, 6.1],
            &[2.0, 1.0, 7.4],
            &[3.0, 4.0, 11.0],
            &[4.0, 3.0, 12.4],
            &[5.0, 6.0, 16.1],
        ],
    );
    let fit = fit(&ds, "y");
    let report = diagnostics::run_all(&fit);

    assert!(report.breusch_pagan.is_ok());
    assert!(matches!(
        report.white.unwrap_err(),
        ModelError::Numerical { .. }
    ));
}

// ==================== Autocorrelation ====================

#[test]
fn test_durbin_watson_alternating_residuals() {
    // Perfect alternation: sum of squared diffs 12 over sum of squares 4
    let residuals: Vector = array![1.0, -1.0, 1.0, -1.0];
    assert_abs_diff_eq!(durbin_watson(&residuals).unwrap(), 3.0, epsilon = 1e-12);
}

#[test]
fn test_durbin_watson_constant_residuals() {
    let residuals: Vector = array![0.5, 0.5, 0.5, 0.5];
    assert_abs_diff_eq!(durbin_watson(&residuals).unwrap(), 0.0, epsilon = 1e-12);
}

#[test]
fn test_durbin_watson_undefined_cases() {
    let one: Vector = array![1.0];
    assert!(durbin_watson(&one).is_err());

    let zeros: Vector = array![0.0, 0.0, 0.0];
    assert!(durbin_watson(&zeros).is_err());
}

// ==================== Multicollinearity ====================

#[test]
fn test_vif_orthogonal_predictors() {
    // Columns sum to zero and are mutually orthogonal: VIF is exactly 1
    let x = array![
        [1.0, 1.0, 1.0],
        [1.0, 1.0, -1.0],
        [1.0, -1.0, 1.0],
        [1.0, -1.0, -1.0],
    ];
    let names = vec!["const".to_string(), "a".to_string(), "b".to_string()];
    let result = vif(&x, &names);

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].variable, "a");
    assert_abs_diff_eq!(result[0].vif, 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result[1].vif, 1.0, epsilon = 1e-9);
}

#[test]
fn test_vif_correlated_predictors_inflate() {
    let fit = fit(&noisy_plane(), "y");
    let result = vif(&fit.x, &fit.variable_names);

    // x1 and x2 move together in this fixture
    assert_eq!(result.len(), 2);
    assert!(result.iter().all(|v| v.vif > 1.0));
}

// ==================== Influence ====================

#[test]
fn test_influence_table_invariants() {
    let fit = fit(&noisy_plane(), "y");
    let table = diagnostics::influence_table(&fit);

    assert_eq!(table.len(), 8);

    // Trace of the hat matrix equals the parameter count
    let leverage_sum: f64 = table.iter().map(|r| r.leverage).sum();
    assert_abs_diff_eq!(leverage_sum, 3.0, epsilon = 1e-9);

    for row in &table {
        assert!(row.leverage > 0.0 && row.leverage < 1.0);
        assert!(row.cooks_distance >= 0.0);
        assert_abs_diff_eq!(
            row.residual,
            row.observed - row.predicted,
            epsilon = 1e-12
        );
        assert_eq!(row.outlier, row.standardized_residual.abs() > 2.0);
    }

    // Ids are the original dataset row indices
    let ids: Vec<usize> = table.iter().map(|r| r.id).collect();
    assert_eq!(ids, fit.row_indices);
}

#[test]
fn test_influence_flags_planted_outlier() {
    // Clean line with one displaced point
    let ds = numeric_dataset(
        &["x", "y"],
        &[
            &[1.0, 3.0],
            &[2.0, 5.0],
            &[3.0, 7.0],
            &[4.0, 9.0],
            &[5.0, 18.0],
            &[6.0, 13.0],
            &[7.0, 15.0],
            &[8.0, 17.0],
            &[9.0, 19.0],
            &[10.0, 21.0],
        ],
    );
    let fit = fit(&ds, "y");
    let table = diagnostics::influence_table(&fit);

    let flagged: Vec<usize> = table
        .iter()
        .filter(|r| r.outlier)
        .map(|r| r.id)
        .collect();
    assert_eq!(flagged, vec![4]);
}
