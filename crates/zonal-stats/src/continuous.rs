//! Summaries for continuous (numeric) variables.

use serde::Serialize;

use crate::error::{Result, ZonalError};

/// Summary statistics over a masked pixel population.
///
/// `lo_std`/`hi_std` are the mean minus/plus one population standard
/// deviation. Quartiles use linear interpolation on the sorted sample.
/// Values are computed at full precision; rounding happens at shaping time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousSummary {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub lo_std: f64,
    pub hi_std: f64,
}

impl ContinuousSummary {
    /// Reduce a pixel population to its summary.
    ///
    /// Fails with [`ZonalError::EmptyIntersection`] on an empty population
    /// rather than fabricating zeros.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ZonalError::EmptyIntersection);
        }

        let n = values.len() as f64;
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("masked values are finite"));

        let mean = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt();

        Ok(Self {
            min: sorted[0],
            mean,
            max: sorted[sorted.len() - 1],
            median: quantile(&sorted, 0.5),
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
            lo_std: mean - stddev,
            hi_std: mean + stddev,
        })
    }
}

/// Linear-interpolation quantile of a sorted, non-empty sample.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
