//! Summary sheet layouts
//!
//! Each task describes its summary sheet as a static list of items. The
//! builder resolves every item against the participant results and formats it
//! at the item's precision.

use crate::aggregate::Aggregator;
use crate::report::Sheet;
use crate::types::{GroupSummary, ParticipantResult, SummaryStatistics};
use std::fmt;

/// Which participants a summary item ranges over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Participants that pass the layout's validity rule
    Valid,
    /// Every participant in the table
    All,
}

/// Descriptive statistic to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Mean,
    Sd,
    Min,
    Max,
    Median,
}

impl Stat {
    /// The five statistics reported for a primary index
    pub const FULL: [Stat; 5] = [Stat::Mean, Stat::Sd, Stat::Min, Stat::Max, Stat::Median];

    pub fn pick(&self, stats: &SummaryStatistics) -> Option<f64> {
        match self {
            Stat::Mean => stats.mean,
            Stat::Sd => stats.sd,
            Stat::Min => stats.min,
            Stat::Max => stats.max,
            Stat::Median => stats.median,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stat::Mean => "Mean",
            Stat::Sd => "SD",
            Stat::Min => "Min",
            Stat::Max => "Max",
            Stat::Median => "Median",
        };
        f.write_str(label)
    }
}

/// Rule deciding whether a participant counts as having valid data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidWhen {
    /// The named metric is present
    Present(&'static str),
    /// The named metric is present and greater than zero
    Positive(&'static str),
}

impl ValidWhen {
    pub fn holds(&self, result: &ParticipantResult) -> bool {
        match self {
            ValidWhen::Present(metric) => result.metric(metric).is_some(),
            ValidWhen::Positive(metric) => result.metric(metric).is_some_and(|v| v > 0.0),
        }
    }
}

/// One row of a summary sheet
#[derive(Clone, Copy)]
pub enum SummaryItem {
    Blank,
    /// One `"{label} - {stat}"` row per statistic, over the metric's present values
    Stats {
        label: &'static str,
        metric: &'static str,
        stats: &'static [Stat],
        precision: usize,
        scope: Scope,
    },
    /// Number of participants matching a predicate
    Count {
        label: &'static str,
        predicate: fn(&ParticipantResult) -> bool,
        scope: Scope,
    },
    /// Pooled share of answered items across valid participants, `{:.1}%`
    CompletionRate {
        label: &'static str,
        valid_metric: &'static str,
        total_metric: &'static str,
    },
}

/// Layout of a task's summary sheet
#[derive(Clone, Copy)]
pub struct SummaryLayout {
    pub valid_when: ValidWhen,
    pub valid_label: &'static str,
    pub missing_label: &'static str,
    pub items: &'static [SummaryItem],
}

/// One column of the by-condition table
#[derive(Debug, Clone, Copy)]
pub struct ConditionColumn {
    pub header: &'static str,
    pub metric: &'static str,
    pub stat: Stat,
    pub precision: usize,
}

/// Layout of a task's by-condition table
#[derive(Debug, Clone, Copy)]
pub struct ConditionLayout {
    pub valid_when: ValidWhen,
    pub columns: &'static [ConditionColumn],
}

pub const NO_CONDITION_MESSAGE: &str = "No list assignment data available";

/// Builder for summary and by-condition sheets
pub struct SummaryBuilder<'a> {
    missing_token: &'a str,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(missing_token: &'a str) -> Self {
        Self { missing_token }
    }

    /// Build the `Metric,Value` summary sheet.
    ///
    /// With no valid participants only the total and a zero valid count are
    /// reported.
    pub fn summary(&self, layout: &SummaryLayout, results: &[ParticipantResult]) -> Sheet {
        let valid: Vec<&ParticipantResult> = results
            .iter()
            .filter(|r| layout.valid_when.holds(r))
            .collect();

        let mut rows = vec![
            vec!["Total Participants".to_string(), results.len().to_string()],
            vec![layout.valid_label.to_string(), valid.len().to_string()],
        ];

        if valid.is_empty() {
            return Sheet::new("summary", &["Metric", "Value"], rows);
        }

        rows.push(vec![
            layout.missing_label.to_string(),
            (results.len() - valid.len()).to_string(),
        ]);

        for item in layout.items {
            rows.extend(self.item_rows(item, results, &valid));
        }

        Sheet::new("summary", &["Metric", "Value"], rows)
    }

    fn item_rows(
        &self,
        item: &SummaryItem,
        all: &[ParticipantResult],
        valid: &[&ParticipantResult],
    ) -> Vec<Vec<String>> {
        match *item {
            SummaryItem::Blank => vec![vec![String::new(), String::new()]],
            SummaryItem::Stats {
                label,
                metric,
                stats,
                precision,
                scope,
            } => {
                let summary = match scope {
                    Scope::Valid => Aggregator::summarize_metric(valid.iter().copied(), metric),
                    Scope::All => Aggregator::summarize_metric(all, metric),
                };
                stats
                    .iter()
                    .map(|stat| {
                        vec![
                            format!("{label} - {stat}"),
                            self.format(stat.pick(&summary), precision),
                        ]
                    })
                    .collect()
            }
            SummaryItem::Count {
                label,
                predicate,
                scope,
            } => {
                let n = match scope {
                    Scope::Valid => valid.iter().filter(|r| predicate(r)).count(),
                    Scope::All => all.iter().filter(|r| predicate(r)).count(),
                };
                vec![vec![label.to_string(), n.to_string()]]
            }
            SummaryItem::CompletionRate {
                label,
                valid_metric,
                total_metric,
            } => {
                let answered: f64 = valid.iter().filter_map(|r| r.metric(valid_metric)).sum();
                let asked: f64 = valid.iter().filter_map(|r| r.metric(total_metric)).sum();
                let value = if asked > 0.0 {
                    format!("{:.1}%", answered / asked * 100.0)
                } else {
                    self.missing_token.to_string()
                };
                vec![vec![label.to_string(), value]]
            }
        }
    }

    /// Build the by-condition table over valid participants.
    ///
    /// Falls back to a single `Message` row when no valid participant carries
    /// a condition label.
    pub fn by_condition(&self, layout: &ConditionLayout, results: &[ParticipantResult]) -> Sheet {
        let valid: Vec<&ParticipantResult> = results
            .iter()
            .filter(|r| layout.valid_when.holds(r))
            .collect();
        let groups = Aggregator::partition(valid.iter().copied());

        if groups.is_empty() {
            return Sheet::new(
                "summary_by_list",
                &["Message"],
                vec![vec![NO_CONDITION_MESSAGE.to_string()]],
            );
        }

        let mut headers = vec!["List_Assignment", "N_Participants"];
        headers.extend(layout.columns.iter().map(|c| c.header));

        let per_column: Vec<Vec<GroupSummary>> = layout
            .columns
            .iter()
            .map(|column| Aggregator::summarize_by(valid.iter().copied(), column.metric))
            .collect();

        let empty = SummaryStatistics::default();
        let rows = groups
            .into_iter()
            .map(|(label, members)| {
                let mut row = vec![format!("List {label}"), members.len().to_string()];
                for (column, summaries) in layout.columns.iter().zip(&per_column) {
                    let stats = summaries
                        .iter()
                        .find(|group| group.label == label)
                        .map_or(&empty, |group| &group.stats);
                    row.push(self.format(column.stat.pick(stats), column.precision));
                }
                row
            })
            .collect();

        Sheet::new("summary_by_list", &headers, rows)
    }

    fn format(&self, value: Option<f64>, precision: usize) -> String {
        match value {
            Some(v) => format!("{v:.precision$}"),
            None => self.missing_token.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(id: &str, condition: Option<&str>, index: Option<f64>) -> ParticipantResult {
        let mut r = ParticipantResult::new(id);
        r.condition = condition.map(str::to_string);
        r.score("Index", index);
        r.count("Valid_Items", Some(if index.is_some() { 3 } else { 0 }));
        r.count("Total_Items", Some(4));
        r
    }

    fn has_index(r: &ParticipantResult) -> bool {
        r.metric("Index").is_some()
    }

    static ITEMS: &[SummaryItem] = &[
        SummaryItem::Blank,
        SummaryItem::Stats {
            label: "Index",
            metric: "Index",
            stats: &[Stat::Mean, Stat::Sd],
            precision: 3,
            scope: Scope::Valid,
        },
        SummaryItem::Count {
            label: "With Index",
            predicate: has_index,
            scope: Scope::All,
        },
        SummaryItem::CompletionRate {
            label: "Average Completion Rate",
            valid_metric: "Valid_Items",
            total_metric: "Total_Items",
        },
    ];

    static LAYOUT: SummaryLayout = SummaryLayout {
        valid_when: ValidWhen::Present("Index"),
        valid_label: "Participants with Valid Data",
        missing_label: "Participants with Missing Data",
        items: ITEMS,
    };

    fn rows(sheet: &Sheet) -> Vec<(String, String)> {
        sheet
            .rows
            .iter()
            .map(|row| (row[0].clone(), row[1].clone()))
            .collect()
    }

    #[test]
    fn test_summary_rows() {
        let results = vec![
            result("a", None, Some(0.2)),
            result("b", None, None),
            result("c", None, Some(0.4)),
            result("d", None, Some(0.6)),
        ];

        let sheet = SummaryBuilder::new("NA").summary(&LAYOUT, &results);
        let expected: Vec<(String, String)> = [
            ("Total Participants", "4"),
            ("Participants with Valid Data", "3"),
            ("Participants with Missing Data", "1"),
            ("", ""),
            ("Index - Mean", "0.400"),
            ("Index - SD", "0.200"),
            ("With Index", "3"),
            ("Average Completion Rate", "75.0%"),
        ]
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        assert_eq!(rows(&sheet), expected);
        assert_eq!(sheet.headers, vec!["Metric", "Value"]);
    }

    #[test]
    fn test_zero_valid_short_form() {
        let results = vec![result("a", None, None), result("b", None, None)];
        let sheet = SummaryBuilder::new("NA").summary(&LAYOUT, &results);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1], vec!["Participants with Valid Data", "0"]);
    }

    #[test]
    fn test_single_valid_sd_is_missing_token() {
        let results = vec![result("a", None, Some(1.0))];
        let sheet = SummaryBuilder::new("NA").summary(&LAYOUT, &results);
        assert_eq!(sheet.rows[5], vec!["Index - SD", "NA"]);
    }

    #[test]
    fn test_positive_validity() {
        let rule = ValidWhen::Positive("Valid_Items");
        assert!(rule.holds(&result("a", None, Some(1.0))));
        assert!(!rule.holds(&result("b", None, None)));
    }

    #[test]
    fn test_by_condition_groups_valid_only() {
        static COLUMNS: &[ConditionColumn] = &[ConditionColumn {
            header: "Index_Mean",
            metric: "Index",
            stat: Stat::Mean,
            precision: 2,
        }];
        let layout = ConditionLayout {
            valid_when: ValidWhen::Present("Index"),
            columns: COLUMNS,
        };

        let results = vec![
            result("a", Some("2"), Some(1.0)),
            result("b", Some("1"), Some(2.0)),
            result("c", Some("2"), Some(4.0)),
            result("d", Some("3"), None),
        ];

        let sheet = SummaryBuilder::new("NA").by_condition(&layout, &results);
        assert_eq!(
            sheet.headers,
            vec!["List_Assignment", "N_Participants", "Index_Mean"]
        );
        assert_eq!(
            sheet.rows,
            vec![
                vec!["List 1".to_string(), "1".to_string(), "2.00".to_string()],
                vec!["List 2".to_string(), "2".to_string(), "2.50".to_string()],
            ]
        );
    }

    #[test]
    fn test_by_condition_without_labels() {
        let layout = ConditionLayout {
            valid_when: ValidWhen::Present("Index"),
            columns: &[],
        };
        let results = vec![result("a", None, Some(1.0))];
        let sheet = SummaryBuilder::new("NA").by_condition(&layout, &results);
        assert_eq!(sheet.headers, vec!["Message"]);
        assert_eq!(sheet.rows, vec![vec![NO_CONDITION_MESSAGE.to_string()]]);
    }
}
