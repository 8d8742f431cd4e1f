//! Normality tests on residuals
//!
//! Shapiro-Wilk follows Royston's AS R94 approximation (Blom scores for
//! the coefficients, small/large-sample p-value transforms), valid for
//! n in 3..=5000. Kolmogorov-Smirnov standardizes the sample (ddof = 1)
//! and compares against N(0, 1) with the asymptotic Kolmogorov p-value.
//! Jarque-Bera uses biased moments and Pearson kurtosis, so results line
//! up with the usual econometrics references.

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use sv_core::describe;

use crate::{ModelError, Result};

/// Statistic and p-value of a single normality test
#[derive(Debug, Clone, Copy)]
pub struct NormalityTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Jarque-Bera result with the moments it is built from
#[derive(Debug, Clone, Copy)]
pub struct JarqueBera {
    pub statistic: f64,
    pub p_value: f64,
    pub skewness: f64,
    /// Pearson kurtosis (3.0 under normality)
    pub kurtosis: f64,
}

fn numerical(message: impl Into<String>, operation: &str) -> ModelError {
    ModelError::Numerical {
        message: message.into(),
        operation: operation.to_string(),
    }
}

// ==================== Shapiro-Wilk ====================

// Royston polynomial coefficients (AS R94)
const SW_C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const SW_C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const SW_C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const SW_C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const SW_C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const SW_G: [f64; 2] = [-2.273, 0.459];

/// Shapiro-Wilk W test for normality, n in 3..=5000
pub fn shapiro_wilk(data: &[f64]) -> Result<NormalityTest> {
    let n = data.len();
    if n < 3 {
        return Err(numerical(
            format!("Shapiro-Wilk requires at least 3 observations, got {n}"),
            "shapiro_wilk",
        ));
    }
    if n > 5000 {
        return Err(numerical(
            format!("Shapiro-Wilk is limited to n <= 5000, got {n}"),
            "shapiro_wilk",
        ));
    }

    let mut x: Vec<f64> = data.to_vec();
    x.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if x[n - 1] - x[0] < 1e-300 {
        return Err(numerical(
            "all residuals are identical, W is undefined",
            "shapiro_wilk",
        ));
    }

    if n == 3 {
        return shapiro_wilk_n3(&x);
    }

    let nn2 = n / 2;
    let a = sw_coefficients(n, nn2)?;

    // W = (Σ a_i (x_{n+1-i} - x_i))^2 / Σ (x - mean)^2
    let mut sa = 0.0;
    for i in 0..nn2 {
        sa += a[i] * (x[n - 1 - i] - x[i]);
    }
    let ss = describe::sum_sq_dev(&x);
    let w = ((sa * sa) / ss).min(1.0);

    Ok(NormalityTest {
        statistic: w,
        p_value: sw_p_value(w, n).clamp(0.0, 1.0),
    })
}

/// Exact W and p-value for n = 3
fn shapiro_wilk_n3(x: &[f64]) -> Result<NormalityTest> {
    let a1 = std::f64::consts::FRAC_1_SQRT_2;
    let ss = describe::sum_sq_dev(x);
    let numerator = a1 * (x[2] - x[0]);
    let w = ((numerator * numerator) / ss).clamp(0.75, 1.0);
    let p = (1.0 - (6.0 / std::f64::consts::PI) * w.sqrt().acos()).clamp(0.0, 1.0);
    Ok(NormalityTest {
        statistic: w,
        p_value: p,
    })
}

/// Horner evaluation of c[0] + c[1] x + c[2] x^2 + ...
fn sw_poly(c: &[f64], x: f64) -> f64 {
    let mut result = c[c.len() - 1];
    for i in (0..c.len() - 1).rev() {
        result = result * x + c[i];
    }
    result
}

/// Royston coefficients from Blom's expected normal order statistics
fn sw_coefficients(n: usize, nn2: usize) -> Result<Vec<f64>> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| numerical(e.to_string(), "sw_coefficients"))?;

    let mut m = vec![0.0; nn2];
    let mut summ2 = 0.0;
    for (i, mi) in m.iter_mut().enumerate() {
        let prob = (i as f64 + 1.0 - 0.375) / (n as f64 + 0.25);
        *mi = normal.inverse_cdf(prob);
        summ2 += *mi * *mi;
    }
    summ2 *= 2.0;
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / (n as f64).sqrt();

    let mut a = vec![0.0; nn2];
    let a1 = sw_poly(&SW_C1, rsn) - m[0] / ssumm2;

    if n <= 5 {
        let fac_sq = summ2 - 2.0 * m[0] * m[0];
        let one_minus = 1.0 - 2.0 * a1 * a1;
        if fac_sq <= 0.0 || one_minus <= 0.0 {
            return Err(numerical("degenerate coefficient scaling", "sw_coefficients"));
        }
        let fac = (fac_sq / one_minus).sqrt();
        a[0] = a1;
        for i in 1..nn2 {
            a[i] = -m[i] / fac;
        }
    } else {
        let a2 = -m[1] / ssumm2 + sw_poly(&SW_C2, rsn);
        let fac_sq = summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1];
        let one_minus = 1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2;
        if fac_sq <= 0.0 || one_minus <= 0.0 {
            return Err(numerical("degenerate coefficient scaling", "sw_coefficients"));
        }
        let fac = (fac_sq / one_minus).sqrt();
        a[0] = a1;
        a[1] = a2;
        for i in 2..nn2 {
            a[i] = -m[i] / fac;
        }
    }

    Ok(a)
}

/// Royston's normalizing transformation of W to a p-value
fn sw_p_value(w: f64, n: usize) -> f64 {
    let nf = n as f64;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();

    let normal = match Normal::new(0.0, 1.0) {
        Ok(d) => d,
        Err(_) => return f64::NAN,
    };

    if n <= 11 {
        let gamma = sw_poly(&SW_G, nf);
        if y >= gamma {
            return 0.0;
        }
        let y2 = -(gamma - y).ln();
        let m = sw_poly(&SW_C3, nf);
        let s = sw_poly(&SW_C4, nf).exp();
        if s < 1e-300 {
            return 0.0;
        }
        1.0 - normal.cdf((y2 - m) / s)
    } else {
        let xx = nf.ln();
        let m = sw_poly(&SW_C5, xx);
        let s = sw_poly(&SW_C6, xx).exp();
        if s < 1e-300 {
            return 0.0;
        }
        1.0 - normal.cdf((y - m) / s)
    }
}

// ==================== Kolmogorov-Smirnov ====================

/// One-sample KS test of standardized data against N(0, 1)
///
/// Standardization uses the sample mean and ddof = 1 standard deviation,
/// matching how the original pipeline fed residuals to the test.
pub fn kolmogorov_smirnov(data: &[f64]) -> Result<NormalityTest> {
    let n = data.len();
    if n < 3 {
        return Err(numerical(
            format!("Kolmogorov-Smirnov requires at least 3 observations, got {n}"),
            "kolmogorov_smirnov",
        ));
    }

    let mean = describe::mean(data);
    let std = describe::std_dev(data, 1);
    if !(std > 0.0) {
        return Err(numerical(
            "zero-variance residuals, KS is undefined",
            "kolmogorov_smirnov",
        ));
    }

    let mut z: Vec<f64> = data.iter().map(|&x| (x - mean) / std).collect();
    z.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let normal = Normal::new(0.0, 1.0).map_err(|e| numerical(e.to_string(), "kolmogorov_smirnov"))?;
    let nf = n as f64;

    let mut d = 0.0f64;
    for (i, &zi) in z.iter().enumerate() {
        let cdf = normal.cdf(zi);
        let d_plus = (i + 1) as f64 / nf - cdf;
        let d_minus = cdf - i as f64 / nf;
        d = d.max(d_plus).max(d_minus);
    }

    Ok(NormalityTest {
        statistic: d,
        p_value: kolmogorov_p(d, n),
    })
}

/// Asymptotic Kolmogorov distribution survival function with the Stephens
/// effective-sample-size correction
fn kolmogorov_p(d: f64, n: usize) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;

    let mut p = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = (-2.0 * jf * jf * lambda * lambda).exp();
        p += if j % 2 == 1 { term } else { -term };
        if term < 1e-12 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

// ==================== Jarque-Bera ====================

/// Jarque-Bera test: `n/6 (S^2 + (K - 3)^2 / 4)` against chi-squared(2)
pub fn jarque_bera(data: &[f64]) -> Result<JarqueBera> {
    let n = data.len();
    if n < 4 {
        return Err(numerical(
            format!("Jarque-Bera requires at least 4 observations, got {n}"),
            "jarque_bera",
        ));
    }

    let skewness = describe::skewness(data);
    let kurtosis = describe::kurtosis(data);

    let nf = n as f64;
    let statistic = (nf / 6.0) * (skewness * skewness + (kurtosis - 3.0).powi(2) / 4.0);

    let chi2 = ChiSquared::new(2.0).map_err(|e| numerical(e.to_string(), "jarque_bera"))?;
    let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

    Ok(JarqueBera {
        statistic,
        p_value,
        skewness,
        kurtosis,
    })
}
