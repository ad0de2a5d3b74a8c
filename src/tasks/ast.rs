//! AST outcome ratings
//!
//! Pleasantness ratings are reverse-scored (`10 - raw`) and averaged. The
//! free-text outcome descriptions are checked for content and collected into
//! a coding template for manual rating.

use super::{yes_no, BoundField, ParticipantAnalysis, Task, TaskAnalyzer};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::indices::{ItemTotals, ReverseKey};
use crate::parser::FieldSpec;
use crate::quality::QualityAnnotator;
use crate::report::Sheet;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{Scope, Stat, SummaryItem, SummaryLayout, ValidWhen};
use crate::types::{Cell, EmptyTokenPolicy, ParticipantResult, TrialValue};
use log::debug;

/// Rating scale used for reverse scoring
pub const RATING_KEY: ReverseKey = ReverseKey::new(0.0, 10.0);

/// Cleaned descriptions that carry no content
const INVALID_MARKERS: &[&str] = &["x", "-", "?", "nan", ""];

const MEAN_RATING: &str = "Mean_Reverse_Scored_Rating";

const RESULT_COLUMNS: &[&str] = &[
    MEAN_RATING,
    "Total_Ratings",
    "Valid_Ratings",
    "Total_Descriptions",
    "Valid_Descriptions",
    "Has_Ratings_Data",
    "Has_Description_Data",
];

const QUALITY_COLUMNS: &[&str] = &[
    "Has_Ratings_Data",
    "Total_Ratings",
    "Valid_Ratings",
    "Has_Description_Data",
    "Total_Descriptions",
    "Valid_Descriptions",
    "Data_Status",
];

const CODING_HEADERS: &[&str] = &[
    "Subject",
    "Main_Outcome_Descriptions",
    "Coder_1",
    "Coder_2",
    "Final",
    "Coder_3",
];

fn has_description_data(result: &ParticipantResult) -> bool {
    matches!(result.cell("Has_Description_Data"), Some(Cell::Text(Some(flag))) if flag == "Yes")
}

fn lacks_description_data(result: &ParticipantResult) -> bool {
    !has_description_data(result)
}

static SUMMARY_ITEMS: &[SummaryItem] = &[
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Mean Reverse-Scored Rating",
        metric: MEAN_RATING,
        stats: &Stat::FULL,
        precision: 4,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Stats {
        label: "Total Ratings per Participant",
        metric: "Total_Ratings",
        stats: &[Stat::Mean],
        precision: 2,
        scope: Scope::Valid,
    },
    SummaryItem::Stats {
        label: "Valid Ratings per Participant",
        metric: "Valid_Ratings",
        stats: &[Stat::Mean],
        precision: 2,
        scope: Scope::Valid,
    },
    SummaryItem::Blank,
    SummaryItem::Count {
        label: "Participants with Description Data",
        predicate: has_description_data,
        scope: Scope::All,
    },
    SummaryItem::Count {
        label: "Participants without Description Data",
        predicate: lacks_description_data,
        scope: Scope::All,
    },
];

static SUMMARY: SummaryLayout = SummaryLayout {
    valid_when: ValidWhen::Present(MEAN_RATING),
    valid_label: "Participants with Valid Ratings",
    missing_label: "Participants with Missing Ratings",
    items: SUMMARY_ITEMS,
};

/// Whether a description carries enough text to be coded
pub fn is_valid_description(description: &str) -> bool {
    let clean = description.trim().to_lowercase();
    clean.chars().count() > 2 && !INVALID_MARKERS.contains(&clean.as_str())
}

pub struct AstAnalyzer {
    ratings: BoundField,
    descriptions: BoundField,
}

impl AstAnalyzer {
    pub fn new(config: &AnalysisConfig, schema: &TableSchema) -> Result<Self, AnalysisError> {
        let cfg = &config.ast;
        Ok(Self {
            ratings: BoundField::bind(
                schema,
                Task::Ast,
                &cfg.ratings_column,
                FieldSpec::real("rating", cfg.rating_delimiter, EmptyTokenPolicy::Retain),
            )?,
            descriptions: BoundField::bind(
                schema,
                Task::Ast,
                &cfg.descriptions_column,
                FieldSpec::text(
                    "description",
                    cfg.description_delimiter,
                    EmptyTokenPolicy::Retain,
                ),
            )?,
        })
    }
}

impl TaskAnalyzer for AstAnalyzer {
    fn task(&self) -> Task {
        Task::Ast
    }

    fn result_columns(&self) -> &'static [&'static str] {
        RESULT_COLUMNS
    }

    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError> {
        let ratings = self.ratings.parse(row);
        let descriptions = self.descriptions.parse(row);

        let reversed: Vec<Option<f64>> = ratings
            .values
            .iter()
            .map(|value| value.as_real().map(|raw| RATING_KEY.reverse(raw)))
            .collect();
        let totals = ItemTotals::from_items(&reversed);

        let valid_descriptions = descriptions
            .values
            .iter()
            .filter(|value| value.as_text().is_some_and(is_valid_description))
            .count();

        let has_ratings = totals.valid > 0;
        let has_descriptions = valid_descriptions > 0;

        let mut result = ParticipantResult::new(participant_id);
        result.score(MEAN_RATING, totals.mean);
        result.count("Total_Ratings", Some(ratings.len()));
        result.count("Valid_Ratings", Some(totals.valid));
        result.count("Total_Descriptions", Some(descriptions.len()));
        result.count("Valid_Descriptions", Some(valid_descriptions));
        result.text("Has_Ratings_Data", yes_no(has_ratings));
        result.text("Has_Description_Data", yes_no(has_descriptions));

        let status = match (has_ratings, has_descriptions) {
            (true, true) => "Complete",
            (true, false) | (false, true) => "Partial",
            (false, false) => "No Data",
        };
        result.text("Data_Status", Some(status.to_string()));
        result.quality =
            QualityAnnotator::annotate(totals.valid, Some(ratings.len()), !ratings.is_empty());

        debug!(
            "ast {}: {} of {} ratings valid, {} descriptions valid",
            participant_id,
            totals.valid,
            ratings.len(),
            valid_descriptions
        );

        // Every description goes to the coders once the participant has any
        // usable text; invalid ones are left for the coders to mark.
        let coding_rows = if has_descriptions {
            descriptions
                .values
                .iter()
                .map(|value: &TrialValue| vec![value.to_string()])
                .collect()
        } else {
            Vec::new()
        };

        Ok(ParticipantAnalysis::new(result).with_companion_rows(coding_rows))
    }

    fn summary_layout(&self) -> &'static SummaryLayout {
        &SUMMARY
    }

    fn quality_columns(&self) -> Option<&'static [&'static str]> {
        Some(QUALITY_COLUMNS)
    }

    /// Coding template, numbering contributing participants from 1
    fn companion_sheet(&self, analyses: &[ParticipantAnalysis]) -> Option<Sheet> {
        let rows = analyses
            .iter()
            .filter(|analysis| !analysis.companion_rows.is_empty())
            .enumerate()
            .flat_map(|(i, analysis)| {
                let subject = (i + 1).to_string();
                analysis.companion_rows.iter().map(move |row| {
                    let mut out = vec![subject.clone()];
                    out.extend(row.iter().cloned());
                    out.extend(std::iter::repeat(String::new()).take(4));
                    out
                })
            })
            .collect();

        Some(Sheet::new("coding_template", CODING_HEADERS, rows))
    }
}
