//! Questionnaire scoring
//!
//! QIDS and GAD are scored as simple sums and means over their item columns.
//! MASQ reverse-keys its negatively worded items and reports three subscale
//! totals. Missing or non-numeric answers are left out of every sum.

use super::{ParticipantAnalysis, Task, TaskAnalyzer};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::indices::{reverse_keyed, subscale, ItemTotals, ReverseKey};
use crate::parser::parse_real;
use crate::quality::QualityAnnotator;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{Scope, Stat, SummaryItem, SummaryLayout, ValidWhen};
use crate::types::ParticipantResult;
use log::debug;

/// Bind every item column, in configured order
fn bind_items(
    task: Task,
    names: &[String],
    schema: &TableSchema,
) -> Result<Vec<usize>, AnalysisError> {
    names
        .iter()
        .map(|name| schema.require(task.as_str(), name))
        .collect()
}

fn item_values(columns: &[usize], row: &ParticipantRow) -> Vec<Option<f64>> {
    columns
        .iter()
        .map(|&column| row.get(column).and_then(parse_real))
        .collect()
}

fn completion_rate(totals: &ItemTotals) -> Option<String> {
    Some(format!("{:.1}%", totals.completion_pct()))
}

fn all_items_answered(result: &ParticipantResult) -> bool {
    matches!(
        (result.metric("Valid_Items"), result.metric("Total_Items")),
        (Some(valid), Some(total)) if valid == total
    )
}

fn some_items_missing(result: &ParticipantResult) -> bool {
    !all_items_answered(result)
}

static SCALE_ITEMS: &[SummaryItem] = &[
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Total Score",
        metric: "Total_Score",
        stats: &Stat::FULL,
        precision: 2,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Mean Score (per item)",
        metric: "Mean_Score",
        stats: &[Stat::Mean, Stat::Sd, Stat::Min, Stat::Max],
        precision: 2,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::CompletionRate {
        label: "Average Completion Rate",
        valid_metric: "Valid_Items",
        total_metric: "Total_Items",
    },
    SummaryItem::Count {
        label: "Participants with Complete Data",
        predicate: all_items_answered,
        scope: Scope::Valid,
    },
    SummaryItem::Count {
        label: "Participants with Incomplete Data",
        predicate: some_items_missing,
        scope: Scope::Valid,
    },
];

static SCALE_SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Positive("Valid_Items"),
    valid_label: "Participants with Valid Data",
    missing_label: "Participants with Missing Data",
    items: SCALE_ITEMS,
};

const SCALE_COLUMNS: &[&str] = &[
    "Total_Score",
    "Mean_Score",
    "Valid_Items",
    "Missing_Items",
    "Total_Items",
    "Completion_Rate",
];

/// Sum-scored questionnaire (QIDS, GAD)
pub struct ScaleAnalyzer {
    task: Task,
    items: Vec<usize>,
}

impl ScaleAnalyzer {
    pub fn qids(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        Self::bind(Task::Qids, &config.questionnaires.qids_items, schema)
    }

    pub fn gad(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        Self::bind(Task::Gad, &config.questionnaires.gad_items, schema)
    }

    fn bind(task: Task, names: &[String], schema: &TableSchema) -> Result<Self, AnalysisError> {
        Ok(Self {
            task,
            items: bind_items(task, names, schema)?,
        })
    }
}

impl TaskAnalyzer for ScaleAnalyzer {
    fn task(&self) -> Task {
        self.task
    }

    fn result_columns(&self) -> &'static [&'static str] {
        SCALE_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let totals = ItemTotals::from_items(&item_values(&self.items, row));
        let n_items = self.items.len();

        let mut result = ParticipantResult::new(participant_id);
        result.score("Total_Score", totals.total);
        result.score("Mean_Score", totals.mean);
        result.count("Valid_Items", Some(totals.valid));
        result.count("Missing_Items", Some(totals.missing));
        result.count("Total_Items", Some(n_items));
        result.text("Completion_Rate", completion_rate(&totals));
        result.quality = QualityAnnotator::annotate(totals.valid, Some(n_items), totals.valid > 0);

        debug!(
            "{} {participant_id}: {} of {n_items} items",
            self.task, totals.valid
        );
        Ok(ParticipantAnalysis::new(result))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SCALE_SUMMARY
    }
}

/// Number of MASQ items
pub const MASQ_ITEM_COUNT: usize = 26;

/// MASQ response scale, reverse keyed as `6 - raw`
pub const MASQ_KEY: ReverseKey = ReverseKey::new(1.0, 5.0);

/// Negatively worded items (1-based)
pub const MASQ_REVERSED: &[usize] = &[1, 9, 15, 19, 23, 25];

/// General distress
pub const MASQ_GD: &[usize] = &[2, 3, 7, 12, 13, 17, 20, 21];

/// Anxious arousal
pub const MASQ_AA: &[usize] = &[4, 6, 8, 10, 14, 16, 18, 22, 24, 26];

/// Anhedonic depression: two positively keyed items plus the reversed set
pub const MASQ_AD: &[usize] = &[5, 11, 1, 9, 15, 19, 23, 25];

const MASQ_COLUMNS: &[&str] = &[
    "GD_Total_Score",
    "GD_Valid_Items",
    "AA_Total_Score",
    "AA_Valid_Items",
    "AD_Total_Score",
    "AD_Valid_Items",
    "Total_Valid_Items",
    "Total_Missing_Items",
    "Total_Items",
    "Completion_Rate",
];

const fn subscale_stats(label: &'static str, metric: &'static str) -> SummaryItem {
    SummaryItem::Stats {
        label,
        metric,
        stats: &Stat::FULL,
        precision: 2,
        scope: Scope::Valid,
    }
}

static MASQ_ITEMS: &[SummaryItem] = &[
    SummaryItem::CompletionRate {
        label: "Average Completion Rate",
        valid_metric: "Total_Valid_Items",
        total_metric: "Total_Items",
    },
    SummaryItem::Blank,
    subscale_stats("GD Total Score", "GD_Total_Score"),
    SummaryItem::Blank,
    subscale_stats("AA Total Score", "AA_Total_Score"),
    SummaryItem::Blank,
    subscale_stats("AD Total Score", "AD_Total_Score"),
];

static MASQ_SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Positive("Total_Valid_Items"),
    valid_label: "Participants with Valid Data",
    missing_label: "Participants with Missing Data",
    items: MASQ_ITEMS,
};

pub struct MasqAnalyzer {
    items: Vec<usize>,
}

impl MasqAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let names = &config.questionnaires.masq_items;
        if names.len() != MASQ_ITEM_COUNT {
            return Err(AnalysisError::InvalidConfig(format!(
                "masq_items must list {MASQ_ITEM_COUNT} columns, got {}",
                names.len()
            )));
        }
        Ok(Self {
            items: bind_items(Task::Masq, names, schema)?,
        })
    }
}

impl TaskAnalyzer for MasqAnalyzer {
    fn task(&self) -> Task {
        Task::Masq
    }

    fn result_columns(&self) -> &'static [&'static str] {
        MASQ_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let scored = reverse_keyed(&item_values(&self.items, row), MASQ_REVERSED, MASQ_KEY);
        let overall = ItemTotals::from_items(&scored);

        let mut result = ParticipantResult::new(participant_id);
        for (total_column, valid_column, items) in [
            ("GD_Total_Score", "GD_Valid_Items", MASQ_GD),
            ("AA_Total_Score", "AA_Valid_Items", MASQ_AA),
            ("AD_Total_Score", "AD_Valid_Items", MASQ_AD),
        ] {
            let totals = subscale(&scored, items);
            result.score(total_column, totals.total);
            result.count(valid_column, Some(totals.valid));
        }
        result.count("Total_Valid_Items", Some(overall.valid));
        result.count("Total_Missing_Items", Some(overall.missing));
        result.count("Total_Items", Some(MASQ_ITEM_COUNT));
        result.text("Completion_Rate", completion_rate(&overall));
        result.quality =
            QualityAnnotator::annotate(overall.valid, Some(MASQ_ITEM_COUNT), overall.valid > 0);

        debug!("masq {participant_id}: {} of {MASQ_ITEM_COUNT} items", overall.valid);
        Ok(ParticipantAnalysis::new(result))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &MASQ_SUMMARY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::row;
    use crate::types::{Cell, DataQuality};

    fn masq_row(answer: impl Fn(usize) -> String) -> (TableSchema, ParticipantRow) {
        let config = AnalysisConfig::default();
        let cells: Vec<(String, String)> = config
            .questionnaires
            .masq_items
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), answer(i + 1)))
            .collect();
        let refs: Vec<(&str, &str)> = cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        row(&refs)
    }

    #[test]
    fn test_scale_sum_skips_missing() {
        let (schema, row) = row(&[
            ("Q1_1", "2"),
            ("Q1_2", "3"),
            ("Q1_3", ""),
            ("Q1_4", "n/a"),
            ("Q1_5", "1"),
            ("Q1_6", "0"),
            ("Q1_7", "2"),
        ]);
        let analyzer = ScaleAnalyzer::gad(&AnalysisConfig::default(), &schema).unwrap();
        let result = analyzer.analyze("R_1", &row).unwrap().result;

        assert_eq!(result.metric("Total_Score"), Some(8.0));
        assert_eq!(result.metric("Mean_Score"), Some(1.6));
        assert_eq!(result.metric("Valid_Items"), Some(5.0));
        assert_eq!(result.metric("Missing_Items"), Some(2.0));
        assert_eq!(
            result.cell("Completion_Rate"),
            Some(&Cell::Text(Some("71.4%".to_string())))
        );
        assert_eq!(
            result.quality,
            DataQuality::Mismatch {
                observed: 5,
                expected: 7
            }
        );
    }

    #[test]
    fn test_unanswered_scale_has_no_total() {
        let config = AnalysisConfig::default();
        let cells: Vec<(&str, &str)> = config
            .questionnaires
            .qids_items
            .iter()
            .map(|name| (name.as_str(), ""))
            .collect();
        let (schema, row) = row(&cells);
        let analyzer = ScaleAnalyzer::qids(&config, &schema).unwrap();
        let result = analyzer.analyze("R_1", &row).unwrap().result;

        assert_eq!(result.metric("Total_Score"), None);
        assert_eq!(result.metric("Valid_Items"), Some(0.0));
        assert_eq!(result.quality, DataQuality::NoData);
    }

    #[test]
    fn test_masq_reverse_keyed_subscales() {
        let (schema, row) = masq_row(|_| "1".to_string());
        let analyzer = MasqAnalyzer::new(&AnalysisConfig::default(), &schema).unwrap();
        let result = analyzer.analyze("R_1", &row).unwrap().result;

        assert_eq!(result.metric("GD_Total_Score"), Some(8.0));
        assert_eq!(result.metric("AA_Total_Score"), Some(10.0));
        // Items 5 and 11 stay at 1; the six reversed items become 5
        assert_eq!(result.metric("AD_Total_Score"), Some(32.0));
        assert_eq!(result.metric("Total_Valid_Items"), Some(26.0));
        assert_eq!(
            result.quality,
            DataQuality::Complete {
                observed: 26,
                expected: 26
            }
        );
    }

    #[test]
    fn test_masq_missing_items_reduce_valid_counts() {
        let (schema, row) = masq_row(|item| match item {
            2 | 9 => String::new(),
            4 => "x".to_string(),
            n => (n % 5 + 1).to_string(),
        });
        let analyzer = MasqAnalyzer::new(&AnalysisConfig::default(), &schema).unwrap();
        let result = analyzer.analyze("R_1", &row).unwrap().result;

        assert_eq!(result.metric("GD_Valid_Items"), Some(7.0));
        assert_eq!(result.metric("AA_Valid_Items"), Some(9.0));
        assert_eq!(result.metric("AD_Valid_Items"), Some(7.0));
        assert_eq!(result.metric("Total_Missing_Items"), Some(3.0));
    }

    #[test]
    fn test_masq_requires_full_item_list() {
        let mut config = AnalysisConfig::default();
        config.questionnaires.masq_items.truncate(20);
        let schema = TableSchema::new(config.questionnaires.masq_items.clone());
        assert!(matches!(
            MasqAnalyzer::new(&config, &schema),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }
}
