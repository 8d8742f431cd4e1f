//! One-way ANOVA computation

use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::debug;

use sv_core::data::TabularDataset;

use crate::anova::{AnovaSummary, GroupSample};
use crate::{ModelError, Result};

/// Run a one-way ANOVA treating each column as one group
///
/// Columns with no numeric observations are excluded from the analysis.
/// The grand mean is the pooled mean of all observations, not the mean of
/// group means; the two only agree for balanced designs.
pub fn one_way(dataset: &TabularDataset, alpha: f64) -> Result<AnovaSummary> {
    let groups = extract_groups(dataset);

    let k = groups.len();
    if k < 2 {
        return Err(ModelError::InsufficientData {
            reason: format!("at least 2 groups with observations are required, found {k}"),
        });
    }

    let n_total: usize = groups.iter().map(|g| g.n).sum();
    if n_total <= k {
        return Err(ModelError::InsufficientData {
            reason: format!(
                "{n_total} observations across {k} groups leave no within-group degrees of freedom"
            ),
        });
    }

    let grand_sum: f64 = groups.iter().flat_map(|g| g.values.iter()).sum();
    let grand_mean = grand_sum / n_total as f64;

    let mut ssb = Vec::with_capacity(k);
    let mut sse = Vec::with_capacity(k);
    let mut ssb_strings = Vec::with_capacity(k);
    let mut sse_strings = Vec::with_capacity(k);

    for g in &groups {
        let ssb_g = g.n as f64 * (g.mean - grand_mean).powi(2);
        ssb.push(ssb_g);
        ssb_strings.push(format!(
            "{} * ({:.4} - {:.4})^2 = {:.4}",
            g.n, g.mean, grand_mean, ssb_g
        ));

        let sse_g: f64 = g.values.iter().map(|&x| (x - g.mean).powi(2)).sum();
        sse.push(sse_g);
        sse_strings.push(sse_derivation(g, sse_g));
    }

    let ssb_total: f64 = ssb.iter().sum();
    let sse_total: f64 = sse.iter().sum();

    let df_between = k - 1;
    let df_within = n_total - k;
    let msb = ssb_total / df_between as f64;
    let mse = sse_total / df_within as f64;

    // Degenerate designs: no between-group variation means F = 0 whatever
    // the within-group variance; zero within-group variance with real
    // between-group variation leaves F undefined. The tolerance is
    // relative to the total sum of squares so tiny-magnitude data is not
    // flattened to F = 0.
    let sst = ssb_total + sse_total;
    let (f_statistic, p_value) = if ssb_total <= 1e-12 * sst {
        (0.0, 1.0)
    } else if mse <= 0.0 {
        return Err(ModelError::DegenerateVariance);
    } else {
        let f = msb / mse;
        let dist = FisherSnedecor::new(df_between as f64, df_within as f64).map_err(|e| {
            ModelError::Numerical {
                message: format!("failed to create F distribution: {e}"),
                operation: "one_way".to_string(),
            }
        })?;
        (f, 1.0 - dist.cdf(f))
    };

    let conclusion = if p_value < alpha {
        "Reject H0: at least one group mean differs significantly from the others.".to_string()
    } else {
        "Fail to reject H0: no significant differences between group means.".to_string()
    };

    debug!(
        k_groups = k,
        n_total,
        f_statistic,
        p_value,
        "one-way ANOVA complete"
    );

    Ok(AnovaSummary {
        groups,
        grand_mean,
        n_total,
        k_groups: k,
        ssb,
        sse,
        ssb_strings,
        sse_strings,
        ssb_total,
        sse_total,
        df_between,
        df_within,
        msb,
        mse,
        f_statistic,
        p_value,
        conclusion,
    })
}

/// Pull the non-empty groups out of the dataset, in column order
fn extract_groups(dataset: &TabularDataset) -> Vec<GroupSample> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let values = dataset.numeric_column(idx).to_vec();
            if values.is_empty() {
                return None;
            }
            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            Some(GroupSample {
                name: name.clone(),
                values,
                n,
                mean,
            })
        })
        .collect()
}

/// Spell out the within-group sum of squares term by term
fn sse_derivation(group: &GroupSample, sse_g: f64) -> String {
    let terms: Vec<String> = group
        .values
        .iter()
        .map(|&x| format!("({x} - {:.4})^2", group.mean))
        .collect();
    format!("{} = {:.4}", terms.join(" + "), sse_g)
}
