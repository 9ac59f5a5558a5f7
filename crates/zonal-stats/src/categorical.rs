//! Summaries for categorical (class-coded) variables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, ZonalError};

/// Class breakdown over a masked pixel population.
///
/// `percentages` covers only classes that actually occur; absent classes
/// contribute no key. The mode tie-break is deterministic: when two classes
/// tie on count, the smaller code wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSummary {
    pub mode: u32,
    pub percentages: BTreeMap<u32, f64>,
}

impl CategoricalSummary {
    /// Reduce class-coded pixel values to mode and percentages.
    ///
    /// Values are raster pixels decoded as floats; each must round to a
    /// non-negative integer class code.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(ZonalError::EmptyIntersection);
        }

        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &v in values {
            let code = v.round();
            if !v.is_finite() || code < 0.0 || code > u32::MAX as f64 || (v - code).abs() > 1e-6 {
                return Err(ZonalError::InvalidCategory(v));
            }
            *counts.entry(code as u32).or_insert(0) += 1;
        }

        // BTreeMap iterates codes in ascending order, so keeping the first
        // strictly-larger count implements the smallest-code tie-break.
        let mut mode = 0u32;
        let mut mode_count = 0usize;
        for (&code, &count) in &counts {
            if count > mode_count {
                mode = code;
                mode_count = count;
            }
        }

        let total = values.len() as f64;
        let percentages = counts
            .into_iter()
            .map(|(code, count)| (code, 100.0 * count as f64 / total))
            .collect();

        Ok(Self { mode, percentages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_population_is_an_error() {
        assert_eq!(
            CategoricalSummary::from_values(&[]),
            Err(ZonalError::EmptyIntersection)
        );
    }

    #[test]
    fn test_mode_and_percentages() {
        // 60 pixels of class 3, 40 of class 1.
        let mut values = vec![3.0; 60];
        values.extend(vec![1.0; 40]);

        let s = CategoricalSummary::from_values(&values).unwrap();

        assert_eq!(s.mode, 3);
        assert_eq!(s.percentages[&3], 60.0);
        assert_eq!(s.percentages[&1], 40.0);
        assert_eq!(s.percentages.len(), 2);
    }

    #[test]
    fn test_tie_break_prefers_smallest_code() {
        let mut values = vec![5.0; 50];
        values.extend(vec![2.0; 50]);

        let s = CategoricalSummary::from_values(&values).unwrap();
        assert_eq!(s.mode, 2);

        // Same input reversed: still the smaller code.
        values.reverse();
        let s = CategoricalSummary::from_values(&values).unwrap();
        assert_eq!(s.mode, 2);
    }

    #[test]
    fn test_absent_classes_have_no_key() {
        let s = CategoricalSummary::from_values(&[0.0, 0.0, 2.0]).unwrap();
        assert!(s.percentages.contains_key(&0));
        assert!(!s.percentages.contains_key(&1));
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let values = vec![0.0, 1.0, 1.0, 2.0, 2.0, 2.0, 4.0];
        let s = CategoricalSummary::from_values(&values).unwrap();
        let sum: f64 = s.percentages.values().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_fractional_value_is_rejected() {
        assert_eq!(
            CategoricalSummary::from_values(&[1.5]),
            Err(ZonalError::InvalidCategory(1.5))
        );
    }

    #[test]
    fn test_negative_code_is_rejected() {
        assert!(matches!(
            CategoricalSummary::from_values(&[-2.0]),
            Err(ZonalError::InvalidCategory(_))
        ));
    }
}
