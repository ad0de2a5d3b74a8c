//! WSAP response selection and RT bias
//!
//! Two variants share the same report shape. The endorse/reject variant asks
//! whether a word relates to a scenario; the forced-choice variant asks the
//! participant to pick one of two interpretations.

use super::{BoundField, ParticipantAnalysis, Task, TaskAnalyzer};
use crate::aligner::TrialAligner;
use crate::classify::{
    classify_all, count_where, rts_where, CategoryMap, CategorySource, ChoicePair,
    ClassificationRules, EndorsementRule, Requirement, TrialOutcome,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::indices::{difference, mean, proportion};
use crate::parser::FieldSpec;
use crate::quality::QualityAnnotator;
use crate::report::Sheet;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{Scope, Stat, SummaryItem, SummaryLayout, ValidWhen};
use crate::types::{
    Category, ClassifiedTrial, EmptyTokenPolicy, Endorsement, ParticipantResult, TrialRecord,
};
use log::debug;

const RSS: &str = "Response_Selection_Score";
const BIAS: &str = "RT_Bias_Index";

const QUALITY_COLUMNS: &[&str] = &["N_Trials", "N_Valid_Trials"];

static SUMMARY_ITEMS: &[SummaryItem] = &[
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Response Selection Score",
        metric: RSS,
        stats: &Stat::FULL,
        precision: 3,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "RT Bias Index",
        metric: BIAS,
        stats: &Stat::FULL,
        precision: 3,
        scope: Scope::All,
    },
];

static SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Present(RSS),
    valid_label: "Participants with Valid Data",
    missing_label: "Participants with Missing Data",
    items: SUMMARY_ITEMS,
};

/// Trials that reached classification with an RT, i.e. complete trials
fn complete_trials(outcomes: &[TrialOutcome]) -> impl Iterator<Item = &ClassifiedTrial> {
    outcomes
        .iter()
        .filter_map(TrialOutcome::classified)
        .filter(|t| t.rt.is_some())
}

fn n_valid(outcomes: &[TrialOutcome]) -> usize {
    outcomes
        .iter()
        .filter(|o| o.is_included() && o.rt().is_some())
        .count()
}

/// Layout of one variant's trial-level export
struct DdmExport {
    headers: &'static [&'static str],
    /// Raw trial field copied after the category, if any
    extra_field: Option<&'static str>,
    /// 1/0 response coding from the trial and its category label
    binary: fn(&TrialRecord, &str) -> bool,
}

/// One row per included trial with an RT and a label. Labels outside the
/// category table are exported as written.
fn ddm_rows(
    export: &DdmExport,
    trials: &[TrialRecord],
    outcomes: &[TrialOutcome],
) -> Vec<Vec<String>> {
    outcomes
        .iter()
        .filter_map(|outcome| {
            let (index, label, rt) = match outcome {
                TrialOutcome::Excluded => return None,
                TrialOutcome::Uncategorized { index, label, rt } => {
                    (*index, label.as_deref()?, (*rt)?)
                }
                TrialOutcome::Classified(t) => (t.index, t.category.as_str(), t.rt?),
            };
            let trial = trials.get(index)?;

            let mut row = vec![
                (index + 1).to_string(),
                trial.get("response").to_string(),
                format!("{rt}"),
                label.to_string(),
            ];
            if let Some(field) = export.extra_field {
                row.push(trial.get(field).to_string());
            }
            row.push(u8::from((export.binary)(trial, label)).to_string());
            Some(row)
        })
        .collect()
}

/// Trial-level sheet with the participant identifier prepended to each row
fn ddm_sheet(export: &DdmExport, analyses: &[ParticipantAnalysis]) -> Sheet {
    let rows = analyses
        .iter()
        .flat_map(|analysis| {
            analysis.companion_rows.iter().map(move |row| {
                let mut out = vec![analysis.result.participant_id.clone()];
                out.extend(row.iter().cloned());
                out
            })
        })
        .collect();
    Sheet::new("ddm_trials", export.headers, rows)
}

fn count_category(outcomes: &[TrialOutcome], category: Category) -> usize {
    complete_trials(outcomes)
        .filter(|t| t.category == category)
        .count()
}

// ---------------------------------------------------------------------------
// Endorse / reject variant
// ---------------------------------------------------------------------------

const ORIGINAL_COLUMNS: &[&str] = &[
    RSS,
    "Prop_Negative_Endorsed",
    "Prop_Benign_Endorsed",
    BIAS,
    "Mean_RT_Endorse_Negative",
    "Mean_RT_Reject_Negative",
    "N_Trials",
    "N_Valid_Trials",
    "N_Depression_Trials",
    "N_Anxiety_Trials",
    "N_Positive_Trials",
];

const SCENARIO_TYPES: CategoryMap = CategoryMap::new(&[
    ("depression", Category::Depression),
    ("anxiety", Category::Anxiety),
    ("positive", Category::Positive),
]);

static ORIGINAL_RULES: ClassificationRules = ClassificationRules {
    requirements: &[Requirement::Present("response")],
    category: CategorySource::Field {
        field: "scenario_type",
        map: SCENARIO_TYPES,
    },
    endorsement: Some(EndorsementRule {
        field: "response",
        endorse_marker: "r",
        reject_marker: "u",
    }),
    rt_field: Some("rt"),
};

fn endorsed(t: &ClassifiedTrial) -> bool {
    t.endorsement == Some(Endorsement::Endorsed)
}

static ORIGINAL_DDM: DdmExport = DdmExport {
    headers: &[
        "participant_id",
        "trial",
        "response",
        "rt",
        "category",
        "word_type",
        "response_binary",
    ],
    extra_field: Some("word_type"),
    binary: response_endorsed,
};

fn response_endorsed(trial: &TrialRecord, _label: &str) -> bool {
    trial.get("response").matches("r")
}

pub struct WsapOriginalAnalyzer {
    responses: BoundField,
    rts: BoundField,
    scenario_types: BoundField,
    word_types: BoundField,
}

impl WsapOriginalAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let cfg = &config.wsap_original;
        let d = cfg.delimiter;
        let task = Task::WsapOriginal;
        Ok(Self {
            responses: BoundField::bind(
                schema,
                task,
                &cfg.responses_column,
                FieldSpec::text("response", d, EmptyTokenPolicy::Retain),
            )?,
            rts: BoundField::bind(
                schema,
                task,
                &cfg.reaction_times_column,
                FieldSpec::real("rt", d, EmptyTokenPolicy::Retain),
            )?,
            scenario_types: BoundField::bind(
                schema,
                task,
                &cfg.scenario_types_column,
                FieldSpec::text("scenario_type", d, EmptyTokenPolicy::Retain),
            )?,
            word_types: BoundField::bind(
                schema,
                task,
                &cfg.word_types_column,
                FieldSpec::text("word_type", d, EmptyTokenPolicy::Retain),
            )?,
        })
    }
}

impl TaskAnalyzer for WsapOriginalAnalyzer {
    fn task(&self) -> Task {
        Task::WsapOriginal
    }

    fn result_columns(&self) -> &'static [&'static str] {
        ORIGINAL_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let fields = [&self.responses, &self.rts, &self.scenario_types, &self.word_types];
        let trials = TrialAligner::align(&fields.map(|field| field.parse(row)));
        if trials.is_empty() {
            return Err(AnalysisError::NoTrialData);
        }

        let outcomes = classify_all(&trials, &ORIGINAL_RULES);

        let negative = count_where(&outcomes, |t| t.category.is_negative());
        let negative_endorsed = count_where(&outcomes, |t| t.category.is_negative() && endorsed(t));
        let benign = count_where(&outcomes, |t| t.category == Category::Positive);
        let benign_endorsed =
            count_where(&outcomes, |t| t.category == Category::Positive && endorsed(t));

        let prop_negative = proportion(negative_endorsed, negative);
        let prop_benign = proportion(benign_endorsed, benign);

        let rt_endorse = mean(rts_where(&outcomes, |t| {
            t.category.is_negative() && endorsed(t)
        }));
        let rt_reject = mean(rts_where(&outcomes, |t| {
            t.category.is_negative() && t.endorsement == Some(Endorsement::Rejected)
        }));

        let n_valid = n_valid(&outcomes);

        let mut result = ParticipantResult::new(participant_id);
        result.score(RSS, difference(prop_negative, prop_benign));
        result.score("Prop_Negative_Endorsed", prop_negative);
        result.score("Prop_Benign_Endorsed", prop_benign);
        result.score(BIAS, difference(rt_endorse, rt_reject));
        result.score("Mean_RT_Endorse_Negative", rt_endorse);
        result.score("Mean_RT_Reject_Negative", rt_reject);
        result.count("N_Trials", Some(trials.len()));
        result.count("N_Valid_Trials", Some(n_valid));
        result.count(
            "N_Depression_Trials",
            Some(count_category(&outcomes, Category::Depression)),
        );
        result.count(
            "N_Anxiety_Trials",
            Some(count_category(&outcomes, Category::Anxiety)),
        );
        result.count(
            "N_Positive_Trials",
            Some(count_category(&outcomes, Category::Positive)),
        );
        result.quality = QualityAnnotator::annotate(n_valid, Some(trials.len()), true);

        debug!(
            "wsap_original {participant_id}: {n_valid} of {} trials valid",
            trials.len()
        );

        let rows = ddm_rows(&ORIGINAL_DDM, &trials, &outcomes);
        Ok(ParticipantAnalysis::new(result).with_companion_rows(rows))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SUMMARY
    }

    fn quality_columns(&self) -> Option<&'static [&'static str]> {
        Some(QUALITY_COLUMNS)
    }

    fn companion_sheet(&self, analyses: &[ParticipantAnalysis]) -> Option<Sheet> {
        Some(ddm_sheet(&ORIGINAL_DDM, analyses))
    }
}

// ---------------------------------------------------------------------------
// Forced-choice variant
// ---------------------------------------------------------------------------

const NEW_COLUMNS: &[&str] = &[
    RSS,
    "Prop_Negative_Chosen",
    "Prop_Benign_Chosen",
    BIAS,
    "Mean_RT_Negative",
    "Mean_RT_Benign",
    "N_Trials",
    "N_Valid_Trials",
    "N_Depression_Chosen",
    "N_Anxiety_Chosen",
    "N_Positive_Chosen",
];

const VALENCES: CategoryMap = CategoryMap::new(&[
    ("anxiety", Category::Anxiety),
    ("depression", Category::Depression),
    ("benign", Category::Benign),
    ("positive", Category::Positive),
]);

fn chose_negative(t: &ClassifiedTrial) -> bool {
    t.category.is_negative()
}

static NEW_DDM: DdmExport = DdmExport {
    headers: &[
        "participant_id",
        "trial",
        "response",
        "rt",
        "category",
        "response_binary",
    ],
    extra_field: None,
    binary: label_negative,
};

fn label_negative(_trial: &TrialRecord, label: &str) -> bool {
    VALENCES.lookup(label).is_some_and(|c| c.is_negative())
}

pub struct WsapNewAnalyzer {
    rts: BoundField,
    valences: BoundField,
    responses: BoundField,
    rules: ClassificationRules,
}

impl WsapNewAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let cfg = &config.wsap_new;
        let d = cfg.delimiter;
        let task = Task::WsapNew;
        Ok(Self {
            rts: BoundField::bind(
                schema,
                task,
                &cfg.reaction_times_column,
                FieldSpec::real("rt", d, EmptyTokenPolicy::Retain),
            )?,
            valences: BoundField::bind(
                schema,
                task,
                &cfg.valences_column,
                FieldSpec::text("valence", d, EmptyTokenPolicy::Retain),
            )?,
            responses: BoundField::bind(
                schema,
                task,
                &cfg.responses_column,
                FieldSpec::text("response", d, EmptyTokenPolicy::Retain),
            )?,
            rules: ClassificationRules {
                requirements: &[],
                category: CategorySource::Choice {
                    pair: ChoicePair {
                        choice_field: "response",
                        options_field: "valence",
                        left_marker: "j",
                        right_marker: "f",
                        separator: cfg.pair_separator,
                    },
                    map: VALENCES,
                },
                endorsement: None,
                rt_field: Some("rt"),
            },
        })
    }
}

impl TaskAnalyzer for WsapNewAnalyzer {
    fn task(&self) -> Task {
        Task::WsapNew
    }

    fn result_columns(&self) -> &'static [&'static str] {
        NEW_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let fields = [&self.rts, &self.valences, &self.responses];
        let trials = TrialAligner::align(&fields.map(|field| field.parse(row)));
        if trials.is_empty() {
            return Err(AnalysisError::NoTrialData);
        }

        let outcomes = classify_all(&trials, &self.rules);

        // Both proportions share the resolved-choice denominator, including
        // choices outside the valence table.
        let resolved = outcomes.iter().filter(|o| o.is_included()).count();
        let prop_negative = proportion(count_where(&outcomes, chose_negative), resolved);
        let prop_benign = proportion(count_where(&outcomes, |t| t.category.is_benign()), resolved);

        let rt_negative = mean(rts_where(&outcomes, chose_negative));
        let rt_benign = mean(rts_where(&outcomes, |t| t.category.is_benign()));

        let n_valid = n_valid(&outcomes);

        let mut result = ParticipantResult::new(participant_id);
        result.score(RSS, difference(prop_negative, prop_benign));
        result.score("Prop_Negative_Chosen", prop_negative);
        result.score("Prop_Benign_Chosen", prop_benign);
        result.score(BIAS, difference(rt_negative, rt_benign));
        result.score("Mean_RT_Negative", rt_negative);
        result.score("Mean_RT_Benign", rt_benign);
        result.count("N_Trials", Some(trials.len()));
        result.count("N_Valid_Trials", Some(n_valid));
        result.count(
            "N_Depression_Chosen",
            Some(count_category(&outcomes, Category::Depression)),
        );
        result.count(
            "N_Anxiety_Chosen",
            Some(count_category(&outcomes, Category::Anxiety)),
        );
        result.count(
            "N_Positive_Chosen",
            Some(count_category(&outcomes, Category::Positive)),
        );
        result.quality = QualityAnnotator::annotate(n_valid, Some(trials.len()), true);

        debug!(
            "wsap_new {participant_id}: {resolved} resolved choices, {n_valid} of {} trials valid",
            trials.len()
        );

        let rows = ddm_rows(&NEW_DDM, &trials, &outcomes);
        Ok(ParticipantAnalysis::new(result).with_companion_rows(rows))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SUMMARY
    }

    fn quality_columns(&self) -> Option<&'static [&'static str]> {
        Some(QUALITY_COLUMNS)
    }

    fn companion_sheet(&self, analyses: &[ParticipantAnalysis]) -> Option<Sheet> {
        Some(ddm_sheet(&NEW_DDM, analyses))
    }
}
