//! Sample-level aggregation
//!
//! Computes descriptive statistics over participants with a present metric,
//! optionally partitioned by list/condition label.

use crate::parser::parse_real;
use crate::types::{GroupSummary, ParticipantResult, SummaryStatistics};
use std::cmp::Ordering;

/// Aggregator for descriptive statistics
pub struct Aggregator;

impl Aggregator {
    /// Summarize a set of present values.
    ///
    /// An empty set yields `count = 0` and no statistics. SD uses the sample
    /// (n-1) definition and is `None` for a single value.
    pub fn summarize(values: &[f64]) -> SummaryStatistics {
        if values.is_empty() {
            return SummaryStatistics::default();
        }

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let sd = if n > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        } else {
            None
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        SummaryStatistics {
            count: n,
            mean: Some(mean),
            sd,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            median: Some(median),
        }
    }

    /// Summarize one named metric over the rows where it is present
    pub fn summarize_metric<'a, I>(results: I, metric: &str) -> SummaryStatistics
    where
        I: IntoIterator<Item = &'a ParticipantResult>,
    {
        let values: Vec<f64> = results
            .into_iter()
            .filter_map(|result| result.metric(metric))
            .collect();
        Self::summarize(&values)
    }

    /// Partition rows by condition label in deterministic label order.
    ///
    /// Rows without a label are left out; groups are never empty.
    pub fn partition<'a, I>(results: I) -> Vec<(String, Vec<&'a ParticipantResult>)>
    where
        I: IntoIterator<Item = &'a ParticipantResult>,
    {
        let mut groups: Vec<(String, Vec<&'a ParticipantResult>)> = Vec::new();

        for result in results {
            let Some(label) = result.condition.as_deref() else {
                continue;
            };
            match groups.iter_mut().find(|(existing, _)| existing == label) {
                Some((_, members)) => members.push(result),
                None => groups.push((label.to_string(), vec![result])),
            }
        }

        groups.sort_by(|(a, _), (b, _)| compare_labels(a, b));
        groups
    }

    /// Summarize a metric per condition group, over rows where it is present
    pub fn summarize_by<'a, I>(results: I, metric: &str) -> Vec<GroupSummary>
    where
        I: IntoIterator<Item = &'a ParticipantResult>,
    {
        Self::partition(results.into_iter().filter(|r| r.metric(metric).is_some()))
            .into_iter()
            .map(|(label, members)| GroupSummary {
                label,
                stats: Self::summarize_metric(members, metric),
            })
            .collect()
    }
}

/// Canonical display form of a condition label.
///
/// Integer-valued numeric labels lose their fraction (`"1.0"` → `"1"`);
/// blank labels are `None`.
pub fn normalize_label(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match parse_real(raw) {
        Some(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
            Some(format!("{}", value as i64))
        }
        Some(value) => Some(format!("{value}")),
        None => Some(raw.to_string()),
    }
}

/// Numeric labels first in ascending value, then text labels lexicographically
fn compare_labels(a: &str, b: &str) -> Ordering {
    match (parse_real(a), parse_real(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, condition: Option<&str>, index: Option<f64>) -> ParticipantResult {
        let mut r = ParticipantResult::new(id);
        r.condition = condition.map(str::to_string);
        r.score("Index", index);
        r
    }

    #[test]
    fn test_summarize_basic() {
        let stats = Aggregator::summarize(&[0.2, 0.4, 0.6]);
        assert_eq!(stats.count, 3);
        assert!((stats.mean.unwrap() - 0.4).abs() < 1e-12);
        assert!((stats.sd.unwrap() - 0.2).abs() < 1e-12);
        assert!((stats.median.unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(stats.min, Some(0.2));
        assert_eq!(stats.max, Some(0.6));
    }

    #[test]
    fn test_summarize_empty() {
        let stats = Aggregator::summarize(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.sd, None);
        assert_eq!(stats.median, None);
    }

    #[test]
    fn test_single_value_has_no_sd() {
        let stats = Aggregator::summarize(&[7.0]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.sd, None);
        assert_eq!(stats.median, Some(7.0));
    }

    #[test]
    fn test_even_median() {
        let stats = Aggregator::summarize(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.median, Some(2.5));
    }

    #[test]
    fn test_missing_metric_is_not_counted() {
        let results = vec![
            result("a", None, Some(1.0)),
            result("b", None, None),
            result("c", None, Some(3.0)),
        ];
        let stats = Aggregator::summarize_metric(&results, "Index");
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, Some(2.0));
    }

    #[test]
    fn test_groups_are_sorted_and_nonempty() {
        let results = vec![
            result("a", Some("2"), Some(1.0)),
            result("b", Some("10"), Some(2.0)),
            result("c", Some("1"), Some(3.0)),
            result("d", Some("2"), Some(5.0)),
            result("e", Some("3"), None),
            result("f", None, Some(4.0)),
        ];

        let groups = Aggregator::summarize_by(&results, "Index");
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2", "10"]);
        assert_eq!(groups[1].stats.count, 2);
        assert_eq!(groups[1].stats.mean, Some(3.0));
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("1.0").as_deref(), Some("1"));
        assert_eq!(normalize_label(" 2 ").as_deref(), Some("2"));
        assert_eq!(normalize_label("1.5").as_deref(), Some("1.5"));
        assert_eq!(normalize_label("A").as_deref(), Some("A"));
        assert_eq!(normalize_label("  "), None);
    }
}
