//! Summary Aggregator Module
//! Tested-count weighted averages and the gap against the scale-score benchmark.

use crate::data::{saturating_total, CaasppRecord, EntityQuery, EntityType};
use crate::series::GradeSeries;
use serde::Serialize;
use std::cmp::Ordering;

/// Scale score near the ELA "Standard Met" cut.
pub const DEFAULT_BENCHMARK: f64 = 2500.0;

/// Round to one decimal place for presentation.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Headline figures for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    pub entity_name: String,
    pub entity_type: EntityType,
    pub weighted_average: Option<f64>,
    pub gap_vs_benchmark: Option<f64>,
    pub total_tested: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    benchmark: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_BENCHMARK)
    }
}

impl Aggregator {
    pub fn new(benchmark: f64) -> Self {
        Self { benchmark }
    }

    pub fn benchmark(&self) -> f64 {
        self.benchmark
    }

    /// Summarize deduplicated CAASPP rows restricted to the tested grades.
    pub fn summarize(&self, query: &EntityQuery, rows: &[CaasppRecord]) -> SummaryResult {
        let pairs: Vec<(Option<f64>, u64)> = rows
            .iter()
            .map(|row| (row.mean_scale_score, row.tested))
            .collect();

        let total_tested = saturating_total(pairs.iter().map(|&(_, tested)| tested));
        let average = Self::weighted_average(&pairs);
        let weighted_average = average.map(round1);
        let gap_vs_benchmark = weighted_average.map(|avg| round1(avg - self.benchmark));

        SummaryResult {
            entity_name: query.entity_name.clone(),
            entity_type: query.entity_type,
            weighted_average,
            gap_vs_benchmark,
            total_tested,
        }
    }

    /// `sum(value * weight) / sum(weight)` at full precision.
    ///
    /// A missing value adds nothing to the numerator but its weight still
    /// counts in the denominator. `None` when the total weight is zero.
    /// Pairs are summed in sorted order so the result does not depend on
    /// row order.
    pub fn weighted_average(pairs: &[(Option<f64>, u64)]) -> Option<f64> {
        let mut sorted = pairs.to_vec();
        sorted.sort_by(|a, b| compare_values(a.0, b.0).then(a.1.cmp(&b.1)));

        let total = saturating_total(sorted.iter().map(|&(_, weight)| weight));
        if total == 0 {
            return None;
        }

        let weighted: f64 = sorted
            .iter()
            .filter_map(|&(value, weight)| value.map(|v| v * weight as f64))
            .sum();
        Some(weighted / total as f64)
    }

    /// Mean of a series' numeric slots.
    pub fn series_mean(series: &GradeSeries) -> Option<f64> {
        let values: Vec<f64> = series.defined_values().collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn compare_values(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
