//! SST negativity score
//!
//! Coded sentence interpretations are counted by category. The negativity
//! score is `negative / (negative + positive)`; mixed and unclear codes stay
//! out of both terms.

use super::{BoundField, ListColumn, ParticipantAnalysis, Task, TaskAnalyzer};
use crate::aligner::TrialAligner;
use crate::classify::{classify_all, count_where, CategoryMap, CategorySource, ClassificationRules};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::indices::proportion;
use crate::parser::{parse_count, FieldSpec};
use crate::quality::QualityAnnotator;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{
    ConditionColumn, ConditionLayout, Scope, Stat, SummaryItem, SummaryLayout, ValidWhen,
};
use crate::types::{Category, EmptyTokenPolicy, ParticipantResult};
use log::debug;

const SCORE: &str = "Negativity_Score";

const RESULT_COLUMNS: &[&str] = &[
    "List_Assignment",
    "Total_Completed_Sentences",
    "Negative_D_Count",
    "Negative_GA_Count",
    "Total_Negative_Count",
    "Positive_Count",
    "Mixed_Count",
    "Unclear_Count",
    SCORE,
];

const INTERPRETATIONS: CategoryMap = CategoryMap::new(&[
    ("negative_D", Category::NegativeD),
    ("negative_GA", Category::NegativeGa),
    ("positive", Category::Positive),
    ("mixed", Category::Mixed),
    ("unclear", Category::Unclear),
]);

static RULES: ClassificationRules = ClassificationRules {
    requirements: &[],
    category: CategorySource::Field {
        field: "interpretation",
        map: INTERPRETATIONS,
    },
    endorsement: None,
    rt_field: None,
};

const fn count_stats(label: &'static str, metric: &'static str) -> SummaryItem {
    SummaryItem::Stats {
        label,
        metric,
        stats: &[Stat::Mean, Stat::Sd],
        precision: 2,
        scope: Scope::Valid,
    }
}

static SUMMARY_ITEMS: &[SummaryItem] = &[
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Negativity Score",
        metric: SCORE,
        stats: &Stat::FULL,
        precision: 4,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    count_stats("Total Completed Sentences", "Total_Completed_Sentences"),
    SummaryItem::Stats {
        label: "Total Completed Sentences",
        metric: "Total_Completed_Sentences",
        stats: &[Stat::Min, Stat::Max],
        precision: 0,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    count_stats("Negative Sentences (D)", "Negative_D_Count"),
    count_stats("Negative Sentences (GA)", "Negative_GA_Count"),
    count_stats("Total Negative Sentences", "Total_Negative_Count"),
    SummaryItem::Blank,
    count_stats("Positive Sentences", "Positive_Count"),
    count_stats("Mixed Sentences", "Mixed_Count"),
    count_stats("Unclear Sentences", "Unclear_Count"),
];

static SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Present(SCORE),
    valid_label: "Participants with Valid Data",
    missing_label: "Participants with Missing Data",
    items: SUMMARY_ITEMS,
};

static BY_LIST: ConditionLayout = ConditionLayout {
    valid_when: ValidWhen::Present(SCORE),
    columns: &[
        ConditionColumn {
            header: "Negativity_Score_Mean",
            metric: SCORE,
            stat: Stat::Mean,
            precision: 4,
        },
        ConditionColumn {
            header: "Negativity_Score_SD",
            metric: SCORE,
            stat: Stat::Sd,
            precision: 4,
        },
        ConditionColumn {
            header: "Negativity_Score_Median",
            metric: SCORE,
            stat: Stat::Median,
            precision: 4,
        },
        ConditionColumn {
            header: "Total_Negative_Mean",
            metric: "Total_Negative_Count",
            stat: Stat::Mean,
            precision: 2,
        },
        ConditionColumn {
            header: "Total_Negative_SD",
            metric: "Total_Negative_Count",
            stat: Stat::Sd,
            precision: 2,
        },
    ],
};

pub struct SstAnalyzer {
    interpretations: BoundField,
    total_completed: usize,
    list: ListColumn,
}

impl SstAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let cfg = &config.sst;
        Ok(Self {
            interpretations: BoundField::bind(
                schema,
                Task::Sst,
                &cfg.interpretations_column,
                FieldSpec::text("interpretation", cfg.delimiter, EmptyTokenPolicy::Retain),
            )?,
            total_completed: schema.require(Task::Sst.as_str(), &cfg.total_completed_column)?,
            list: ListColumn::bind(schema, config),
        })
    }
}

impl TaskAnalyzer for SstAnalyzer {
    fn task(&self) -> Task {
        Task::Sst
    }

    fn result_columns(&self) -> &'static [&'static str] {
        RESULT_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let mut result = ParticipantResult::new(participant_id);
        self.list.apply(row, &mut result);

        let raw_completed = row.get(self.total_completed);
        let completed = parse_count(raw_completed);
        result.count("Total_Completed_Sentences", completed);

        if self.interpretations.raw(row).is_none() || raw_completed.is_none() {
            debug!("sst {participant_id}: no data");
            return Ok(ParticipantAnalysis::new(result));
        }

        let field = self.interpretations.parse(row);
        let n_tokens = field.len();
        let outcomes = classify_all(&TrialAligner::align(&[field]), &RULES);
        let count = |category: Category| count_where(&outcomes, |t| t.category == category);

        let negative_d = count(Category::NegativeD);
        let negative_ga = count(Category::NegativeGa);
        let negative = negative_d + negative_ga;
        let positive = count(Category::Positive);
        let mixed = count(Category::Mixed);

        result.count("Negative_D_Count", Some(negative_d));
        result.count("Negative_GA_Count", Some(negative_ga));
        result.count("Total_Negative_Count", Some(negative));
        result.count("Positive_Count", Some(positive));
        result.count("Mixed_Count", Some(mixed));
        result.count("Unclear_Count", Some(count(Category::Unclear)));

        let denominator = negative + positive;
        if mixed > denominator {
            debug!("sst {participant_id}: excluded, {mixed} mixed vs {denominator}");
            result.score(SCORE, None);
            result.quality = QualityAnnotator::excluded(format!(
                "Mixed ({mixed}) > Positive + Negative ({denominator})"
            ));
            return Ok(ParticipantAnalysis::new(result));
        }

        result.score(SCORE, proportion(negative, denominator));
        result.quality = QualityAnnotator::annotate(n_tokens, completed, true);

        Ok(ParticipantAnalysis::new(result))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SUMMARY
    }

    fn condition_layout(&self) -> Option<&'static ConditionLayout> {
        Some(&BY_LIST)
    }
}
