//! Task analyzers
//!
//! Each analyzer binds its input columns against the table header once, then
//! scores one participant row at a time through the shared parse, align,
//! classify and reduce stages.

mod ast;
mod pst;
mod questionnaire;
mod sst;
mod wsap;

pub use ast::AstAnalyzer;
pub use pst::PstAnalyzer;
pub use questionnaire::{MasqAnalyzer, ScaleAnalyzer};
pub use sst::SstAnalyzer;
pub use wsap::{WsapNewAnalyzer, WsapOriginalAnalyzer};

use crate::aggregate::normalize_label;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::parser::{FieldSpec, TrialParser};
use crate::report::Sheet;
use crate::schema::{ParticipantRow, TableSchema};
use crate::summary::{ConditionLayout, SummaryLayout};
use crate::types::{ParticipantResult, TrialField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Ast,
    Pst,
    Sst,
    WsapOriginal,
    WsapNew,
    Qids,
    Gad,
    Masq,
}

impl Task {
    pub const ALL: [Task; 8] = [
        Task::Ast,
        Task::Pst,
        Task::Sst,
        Task::WsapOriginal,
        Task::WsapNew,
        Task::Qids,
        Task::Gad,
        Task::Masq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Ast => "ast",
            Task::Pst => "pst",
            Task::Sst => "sst",
            Task::WsapOriginal => "wsap_original",
            Task::WsapNew => "wsap_new",
            Task::Qids => "qids",
            Task::Gad => "gad",
            Task::Masq => "masq",
        }
    }

    /// Columns the task cannot run without, under `config`
    pub fn required_columns(&self, config: &AnalysisConfig) -> Vec<String> {
        match self {
            Task::Ast => vec![
                config.ast.ratings_column.clone(),
                config.ast.descriptions_column.clone(),
            ],
            Task::Pst => vec![
                config.pst.reaction_times_column.clone(),
                config.pst.word_accuracy_column.clone(),
                config.pst.scenario_types_column.clone(),
                config.pst.scenarios_completed_column.clone(),
            ],
            Task::Sst => vec![
                config.sst.interpretations_column.clone(),
                config.sst.total_completed_column.clone(),
            ],
            Task::WsapOriginal => vec![
                config.wsap_original.responses_column.clone(),
                config.wsap_original.reaction_times_column.clone(),
                config.wsap_original.scenario_types_column.clone(),
                config.wsap_original.word_types_column.clone(),
            ],
            Task::WsapNew => vec![
                config.wsap_new.reaction_times_column.clone(),
                config.wsap_new.valences_column.clone(),
                config.wsap_new.responses_column.clone(),
            ],
            Task::Qids => config.questionnaires.qids_items.clone(),
            Task::Gad => config.questionnaires.gad_items.clone(),
            Task::Masq => config.questionnaires.masq_items.clone(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        Task::ALL
            .into_iter()
            .find(|task| task.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| AnalysisError::UnknownTask(s.to_string()))
    }
}

/// Scored participant plus any rows it contributes to a companion sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantAnalysis {
    pub result: ParticipantResult,
    pub companion_rows: Vec<Vec<String>>,
}

impl ParticipantAnalysis {
    pub fn new(result: ParticipantResult) -> Self {
        Self {
            result,
            companion_rows: Vec::new(),
        }
    }

    pub fn with_companion_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.companion_rows = rows;
        self
    }

    /// Row for a participant whose scoring failed: no indices, error quality
    pub fn error(participant_id: &str, error: &AnalysisError) -> Self {
        let mut result = ParticipantResult::new(participant_id);
        result.quality = crate::quality::QualityAnnotator::error(error.to_string());
        Self::new(result)
    }
}

/// Trait for task analyzers
pub trait TaskAnalyzer {
    fn task(&self) -> Task;

    /// Result columns between the identifier and the quality label
    fn result_columns(&self) -> &'static [&'static str];

    /// Score one participant
    fn analyze(
        &self,
        participant_id: &str,
        row: &ParticipantRow,
    ) -> Result<ParticipantAnalysis, AnalysisError>;

    fn summary_layout(&self) -> &'static SummaryLayout;

    fn condition_layout(&self) -> Option<&'static ConditionLayout> {
        None
    }

    /// Columns of the separate quality sheet, if the task writes one
    fn quality_columns(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Extra task-specific sheet built from all participants' companion rows
    fn companion_sheet(&self, _analyses: &[ParticipantAnalysis]) -> Option<Sheet> {
        None
    }
}

/// Build the analyzer for `task`, binding its columns against `schema`
pub fn analyzer_for(
    task: Task,
    config: &AnalysisConfig,
    schema: &TableSchema,
) -> Result<Box<dyn TaskAnalyzer>, AnalysisError> {
    Ok(match task {
        Task::Ast => Box::new(AstAnalyzer::new(config, schema)?),
        Task::Pst => Box::new(PstAnalyzer::new(config, schema)?),
        Task::Sst => Box::new(SstAnalyzer::new(config, schema)?),
        Task::WsapOriginal => Box::new(WsapOriginalAnalyzer::new(config, schema)?),
        Task::WsapNew => Box::new(WsapNewAnalyzer::new(config, schema)?),
        Task::Qids => Box::new(ScaleAnalyzer::qids(config, schema)?),
        Task::Gad => Box::new(ScaleAnalyzer::gad(config, schema)?),
        Task::Masq => Box::new(MasqAnalyzer::new(config, schema)?),
    })
}

/// A trial column resolved against the header, with its parse spec
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundField {
    column: usize,
    spec: FieldSpec,
}

impl BoundField {
    pub(crate) fn bind(
        schema: &TableSchema,
        task: Task,
        column_name: &str,
        spec: FieldSpec,
    ) -> Result<Self, AnalysisError> {
        Ok(Self {
            column: schema.require(task.as_str(), column_name)?,
            spec,
        })
    }

    pub(crate) fn raw<'a>(&self, row: &'a ParticipantRow) -> Option<&'a str> {
        row.get(self.column)
    }

    pub(crate) fn parse(&self, row: &ParticipantRow) -> TrialField {
        TrialParser::parse_field(self.raw(row), &self.spec)
    }
}

/// Optional list/condition column shared by the stratified tasks
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListColumn(Option<usize>);

impl ListColumn {
    pub(crate) fn bind(schema: &TableSchema, config: &AnalysisConfig) -> Self {
        Self(schema.column(&config.condition_column))
    }

    /// Attach the normalized label to `result` and as a text column
    pub(crate) fn apply(&self, row: &ParticipantRow, result: &mut ParticipantResult) {
        let label = self.0.and_then(|column| row.get(column)).and_then(normalize_label);
        result.condition = label.clone();
        result.text("List_Assignment", label);
    }
}

pub(crate) fn yes_no(flag: bool) -> Option<String> {
    Some(if flag { "Yes" } else { "No" }.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_names_roundtrip() {
        for task in Task::ALL {
            assert_eq!(task.as_str().parse::<Task>().unwrap(), task);
        }
        assert_eq!("WSAP-new".parse::<Task>().unwrap(), Task::WsapNew);
        assert!(matches!(
            "stroop".parse::<Task>(),
            Err(AnalysisError::UnknownTask(_))
        ));
    }

    #[test]
    fn test_required_columns_follow_config() {
        let mut config = AnalysisConfig::default();
        config.sst.interpretations_column = "interp".to_string();
        let columns = Task::Sst.required_columns(&config);
        assert_eq!(columns, vec!["interp", "main_total_completed"]);
        assert_eq!(Task::Masq.required_columns(&config).len(), 26);
    }

    #[test]
    fn test_error_analysis_has_no_indices() {
        let analysis = ParticipantAnalysis::error("R_9", &AnalysisError::NoTrialData);
        assert!(analysis.result.columns.is_empty());
        assert_eq!(
            analysis.result.quality.to_string(),
            "Error: No trial data available"
        );
    }

    #[test]
    fn test_analyzer_binding_reports_missing_column() {
        let schema = TableSchema::new(["ResponseId"]);
        let err = analyzer_for(Task::Pst, &AnalysisConfig::default(), &schema)
            .err()
            .unwrap();
        assert!(matches!(err, AnalysisError::MissingColumn { .. }));
    }
}
