//! PST reaction-time bias
//!
//! Only scenarios whose word fragment was resolved correctly are counted. The
//! bias index is the mean RT over negative (anxiety, depression) scenarios
//! minus the mean RT over positive scenarios.

use super::{BoundField, ListColumn, ParticipantAnalysis, Task, TaskAnalyzer};
use crate::aligner::TrialAligner;
use crate::classify::{
    classify_all, rts_where, AccuracyGate, CategoryMap, CategorySource, ClassificationRules,
    Requirement, TrialOutcome,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::indices::{difference, mean};
use crate::parser::{parse_count, FieldSpec};
use crate::quality::QualityAnnotator;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{
    ConditionColumn, ConditionLayout, Scope, Stat, SummaryItem, SummaryLayout, ValidWhen,
};
use crate::types::{Category, EmptyTokenPolicy, ParticipantResult};
use log::debug;

const BIAS: &str = "RT_Bias_Index";

const RESULT_COLUMNS: &[&str] = &[
    "List_Assignment",
    "Main_Scenarios_Completed",
    "N_Correctly_Resolved",
    "N_Negative_Valid",
    "N_Positive_Valid",
    "Mean_RT_Negative",
    "Mean_RT_Positive",
    BIAS,
];

const SCENARIO_TYPES: CategoryMap = CategoryMap::new(&[
    ("anxiety", Category::Anxiety),
    ("depression", Category::Depression),
    ("positive", Category::Positive),
]);

static RULES: ClassificationRules = ClassificationRules {
    requirements: &[Requirement::Gate(AccuracyGate {
        field: "word_accuracy",
        sentinel: "true",
    })],
    category: CategorySource::Field {
        field: "scenario_type",
        map: SCENARIO_TYPES,
    },
    endorsement: None,
    rt_field: Some("rt"),
};

static SUMMARY_ITEMS: &[SummaryItem] = &[
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "RT Bias Index",
        metric: BIAS,
        stats: &Stat::FULL,
        precision: 3,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Mean RT Negative",
        metric: "Mean_RT_Negative",
        stats: &[Stat::Mean, Stat::Sd],
        precision: 3,
        scope: Scope::Valid,
    },
    SummaryItem::Stats {
        label: "Mean RT Positive",
        metric: "Mean_RT_Positive",
        stats: &[Stat::Mean, Stat::Sd],
        precision: 3,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Correctly Resolved Scenarios",
        metric: "N_Correctly_Resolved",
        stats: &[Stat::Mean, Stat::Sd],
        precision: 2,
        scope: Scope::Valid,
    },
    SummaryItem::Stats {
        label: "Correctly Resolved Scenarios",
        metric: "N_Correctly_Resolved",
        stats: &[Stat::Min, Stat::Max],
        precision: 0,
        scope: Scope::Valid,
    },
];

static SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Present(BIAS),
    valid_label: "Participants with Valid Data",
    missing_label: "Participants with Missing Data",
    items: SUMMARY_ITEMS,
};

static BY_LIST: ConditionLayout = ConditionLayout {
    valid_when: ValidWhen::Present(BIAS),
    columns: &[
        ConditionColumn {
            header: "RT_Bias_Index_Mean",
            metric: BIAS,
            stat: Stat::Mean,
            precision: 3,
        },
        ConditionColumn {
            header: "RT_Bias_Index_SD",
            metric: BIAS,
            stat: Stat::Sd,
            precision: 3,
        },
        ConditionColumn {
            header: "RT_Bias_Index_Median",
            metric: BIAS,
            stat: Stat::Median,
            precision: 3,
        },
        ConditionColumn {
            header: "Mean_RT_Negative_Mean",
            metric: "Mean_RT_Negative",
            stat: Stat::Mean,
            precision: 3,
        },
        ConditionColumn {
            header: "Mean_RT_Positive_Mean",
            metric: "Mean_RT_Positive",
            stat: Stat::Mean,
            precision: 3,
        },
    ],
};

pub struct PstAnalyzer {
    rts: BoundField,
    word_accuracy: BoundField,
    scenario_types: BoundField,
    scenarios_completed: usize,
    list: ListColumn,
}

impl PstAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let cfg = &config.pst;
        let delimiter = cfg.delimiter;
        Ok(Self {
            rts: BoundField::bind(
                schema,
                Task::Pst,
                &cfg.reaction_times_column,
                FieldSpec::real("rt", delimiter, EmptyTokenPolicy::Drop),
            )?,
            word_accuracy: BoundField::bind(
                schema,
                Task::Pst,
                &cfg.word_accuracy_column,
                FieldSpec::text("word_accuracy", delimiter, EmptyTokenPolicy::Drop).lowercased(),
            )?,
            scenario_types: BoundField::bind(
                schema,
                Task::Pst,
                &cfg.scenario_types_column,
                FieldSpec::text("scenario_type", delimiter, EmptyTokenPolicy::Drop).lowercased(),
            )?,
            scenarios_completed: schema
                .require(Task::Pst.as_str(), &cfg.scenarios_completed_column)?,
            list: ListColumn::bind(schema, config),
        })
    }
}

impl TaskAnalyzer for PstAnalyzer {
    fn task(&self) -> Task {
        Task::Pst
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
        let completed = parse_count(row.get(self.scenarios_completed));
        result.count("Main_Scenarios_Completed", completed);

        let fields = [&self.rts, &self.word_accuracy, &self.scenario_types];
        if fields.iter().any(|field| field.raw(row).is_none()) {
            debug!("pst {participant_id}: no data");
            return Ok(ParticipantAnalysis::new(result));
        }

        let trials = TrialAligner::align(&fields.map(|field| field.parse(row)));
        let outcomes = classify_all(&trials, &RULES);

        let n_resolved = outcomes.iter().filter(|o| o.is_included()).count();
        let negative_rts = rts_where(&outcomes, |t| t.category.is_negative());
        let positive_rts = rts_where(&outcomes, |t| t.category == Category::Positive);

        let mean_negative = mean(negative_rts.iter().copied());
        let mean_positive = mean(positive_rts.iter().copied());

        result.count("N_Correctly_Resolved", Some(n_resolved));
        result.count("N_Negative_Valid", Some(negative_rts.len()));
        result.count("N_Positive_Valid", Some(positive_rts.len()));
        result.score("Mean_RT_Negative", mean_negative);
        result.score("Mean_RT_Positive", mean_positive);
        result.score(BIAS, difference(mean_negative, mean_positive));
        result.quality = QualityAnnotator::annotate(n_resolved, completed, true);

        let uncategorized = outcomes
            .iter()
            .filter(|o| matches!(o, TrialOutcome::Uncategorized { .. }))
            .count();
        debug!(
            "pst {participant_id}: {n_resolved} resolved of {} trials, {uncategorized} uncategorized",
            trials.len()
        );

        Ok(ParticipantAnalysis::new(result))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SUMMARY
    }

    fn condition_layout(&self) -> Option<&'static ConditionLayout> {
        Some(&BY_LIST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::test_support::row;
    use crate::types::DataQuality;

    fn analyze(cells: &[(&str, &str)]) -> ParticipantResult {
        let (schema, row) = row(cells);
        let analyzer = PstAnalyzer::new(&AnalysisConfig::default(), &schema).unwrap();
        analyzer.analyze("R_1", &row).unwrap().result
    }

    #[test]
    fn test_accuracy_gated_bias() {
        let result = analyze(&[
            ("list_assignment", "2.0"),
            ("main_reaction_times", "500;600;400"),
            ("main_word_accuracy", "true;false;true"),
            ("main_scenario_types", "anxiety;positive;positive"),
            ("main_scenarios_completed", "3"),
        ]);

        assert_eq!(result.metric("Mean_RT_Negative"), Some(500.0));
        assert_eq!(result.metric("Mean_RT_Positive"), Some(400.0));
        assert_eq!(result.metric(BIAS), Some(100.0));
        assert_eq!(result.metric("N_Correctly_Resolved"), Some(2.0));
        assert_eq!(result.condition.as_deref(), Some("2"));
        assert_eq!(
            result.quality,
            DataQuality::Mismatch {
                observed: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn test_case_and_trailing_delimiters() {
        let result = analyze(&[
            ("main_reaction_times", "450;550;"),
            ("main_word_accuracy", "TRUE;True;"),
            ("main_scenario_types", "Depression;POSITIVE;"),
            ("main_scenarios_completed", "2"),
        ]);

        assert_eq!(result.metric(BIAS), Some(-100.0));
        assert_eq!(
            result.quality,
            DataQuality::Complete {
                observed: 2,
                expected: 2
            }
        );
    }

    #[test]
    fn test_resolved_without_rt_still_counts() {
        let result = analyze(&[
            ("main_reaction_times", "500"),
            ("main_word_accuracy", "true;true"),
            ("main_scenario_types", "anxiety;positive"),
            ("main_scenarios_completed", ""),
        ]);

        assert_eq!(result.metric("N_Correctly_Resolved"), Some(2.0));
        assert_eq!(result.metric("N_Positive_Valid"), Some(0.0));
        assert_eq!(result.metric(BIAS), None);
        assert_eq!(result.quality, DataQuality::Unverified { observed: 2 });
    }

    #[test]
    fn test_missing_field_is_no_data() {
        let result = analyze(&[
            ("list_assignment", "1"),
            ("main_reaction_times", "500;400"),
            ("main_word_accuracy", ""),
            ("main_scenario_types", "anxiety;positive"),
            ("main_scenarios_completed", "2"),
        ]);

        assert_eq!(result.quality, DataQuality::NoData);
        assert_eq!(result.metric(BIAS), None);
        assert_eq!(result.metric("Main_Scenarios_Completed"), Some(2.0));
        assert_eq!(result.condition.as_deref(), Some("1"));
    }
}
