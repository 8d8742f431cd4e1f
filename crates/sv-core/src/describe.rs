//! Descriptive statistics primitives
//!
//! Column-wise building blocks shared by the ANOVA and regression engines.
//! Skewness and kurtosis use the moment conventions of the diagnostic tests
//! downstream: biased central moments, Pearson (non-excess) kurtosis.

/// Arithmetic mean; NaN for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sum of squared deviations from the mean
pub fn sum_sq_dev(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(2)).sum()
}

/// Sample variance with the given delta degrees of freedom
pub fn variance(data: &[f64], ddof: usize) -> f64 {
    let n = data.len();
    if n <= ddof {
        return f64::NAN;
    }
    sum_sq_dev(data) / (n - ddof) as f64
}

/// Sample standard deviation
pub fn std_dev(data: &[f64], ddof: usize) -> f64 {
    variance(data, ddof).sqrt()
}

/// Biased central moment of the given order
fn central_moment(data: &[f64], order: i32) -> f64 {
    let m = mean(data);
    data.iter().map(|&x| (x - m).powi(order)).sum::<f64>() / data.len() as f64
}

/// Moment skewness `m3 / m2^1.5`
pub fn skewness(data: &[f64]) -> f64 {
    let m2 = central_moment(data, 2);
    if m2 < 1e-300 {
        return 0.0;
    }
    central_moment(data, 3) / m2.powf(1.5)
}

/// Pearson kurtosis `m4 / m2^2` (3.0 for a normal distribution)
pub fn kurtosis(data: &[f64]) -> f64 {
    let m2 = central_moment(data, 2);
    if m2 < 1e-300 {
        return 0.0;
    }
    central_moment(data, 4) / (m2 * m2)
}
