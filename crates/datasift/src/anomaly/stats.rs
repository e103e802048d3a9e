//! Small numeric helpers for the detector.

use serde::{Deserialize, Serialize};

/// Descriptive statistics of one numeric column over the anomalous rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    /// Number of values the summary was computed from.
    pub count: usize,
}

/// Running mean/variance/min/max (Welford's online algorithm).
#[derive(Debug, Clone)]
pub(crate) struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub(crate) fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub(crate) fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Sample variance (n - 1 denominator).
    fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }

    pub(crate) fn summary(&self) -> Option<ColumnSummary> {
        if self.count == 0 {
            return None;
        }
        Some(ColumnSummary {
            mean: self.mean,
            std: self.sample_variance().map(f64::sqrt),
            min: self.min,
            max: self.max,
            count: self.count,
        })
    }
}

/// Linear-interpolated quantile of `values`, `q` in `[0, 1]`.
pub(crate) fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats_sample_std() {
        let mut stats = RunningStats::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(v);
        }
        let summary = stats.summary().unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert!((summary.std.unwrap() - 2.138).abs() < 0.001);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let mut stats = RunningStats::new();
        stats.add(3.0);
        assert_eq!(stats.summary().unwrap().std, None);
        assert!(RunningStats::new().summary().is_none());
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[3.0, 1.0, 2.0], 0.5), Some(2.0));
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), Some(2.5));
        assert_eq!(quantile(&[0.0, 10.0], 0.1), Some(1.0));
        assert_eq!(median(&[]), None);
    }
}
