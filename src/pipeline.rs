//! Pipeline orchestration
//!
//! This module provides the public API for cogbias. It loads the participant
//! table, binds each requested task's analyzer against the header, scores
//! every participant in input order and turns the results into report sheets.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::report::{participant_sheet, ReportManifest, ReportWriter, TaskReport};
use crate::schema::ParticipantTable;
use crate::summary::SummaryBuilder;
use crate::tasks::{analyzer_for, ParticipantAnalysis, Task, TaskAnalyzer};
use crate::types::ParticipantResult;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;

/// Score every row of `table` with `analyzer`.
///
/// A participant whose scoring fails becomes an error row; the remaining
/// participants are still scored.
pub fn analyze_table(
    analyzer: &dyn TaskAnalyzer,
    table: &ParticipantTable,
    id_column: usize,
) -> Vec<ParticipantAnalysis> {
    table
        .rows()
        .iter()
        .map(|row| {
            let participant_id = row.get(id_column).unwrap_or_default();
            match analyzer.analyze(participant_id, row) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(
                        "{} participant '{}' (line {}): {}",
                        analyzer.task(),
                        participant_id,
                        row.line,
                        e
                    );
                    ParticipantAnalysis::error(participant_id, &e)
                }
            }
        })
        .collect()
}

/// Build every sheet for one task from its scored participants
pub fn build_report(
    analyzer: &dyn TaskAnalyzer,
    analyses: &[ParticipantAnalysis],
    config: &AnalysisConfig,
) -> TaskReport {
    let results: Vec<ParticipantResult> = analyses.iter().map(|a| a.result.clone()).collect();
    let missing = config.missing_token.as_str();
    let layout = analyzer.summary_layout();
    let builder = SummaryBuilder::new(missing);

    let mut sheets = vec![
        participant_sheet(
            "results",
            &config.id_column,
            analyzer.result_columns(),
            &results,
            missing,
        ),
        builder.summary(layout, &results),
    ];
    if let Some(condition_layout) = analyzer.condition_layout() {
        sheets.push(builder.by_condition(condition_layout, &results));
    }
    if let Some(columns) = analyzer.quality_columns() {
        sheets.push(participant_sheet(
            "quality",
            &config.id_column,
            columns,
            &results,
            missing,
        ));
    }
    if let Some(sheet) = analyzer.companion_sheet(analyses) {
        sheets.push(sheet);
    }

    let valid_participants = results
        .iter()
        .filter(|result| layout.valid_when.holds(result))
        .count();

    TaskReport {
        task: analyzer.task(),
        participants: results.len(),
        valid_participants,
        sheets,
    }
}

/// Required columns a task is missing from the input header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnCheck {
    pub task: Task,
    pub missing: Vec<String>,
}

impl ColumnCheck {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Batch processor holding the analysis configuration.
///
/// Use this to score one exported table for any subset of tasks.
pub struct AnalysisProcessor {
    config: AnalysisConfig,
}

impl Default for AnalysisProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisProcessor {
    /// Create a processor with the default export layout
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load the participant table, skipping the configured metadata rows
    pub fn load(&self, input: &Path) -> Result<ParticipantTable, AnalysisError> {
        let table = ParticipantTable::from_path(input, self.config.metadata_rows)?;
        info!("loaded {} participants from {}", table.len(), input.display());
        Ok(table)
    }

    /// Check each task's required columns against the table header
    pub fn validate(&self, table: &ParticipantTable, tasks: &[Task]) -> Vec<ColumnCheck> {
        let schema = table.schema();
        tasks
            .iter()
            .map(|&task| {
                let mut required = vec![self.config.id_column.clone()];
                required.extend(task.required_columns(&self.config));
                let missing = required
                    .into_iter()
                    .filter(|column| schema.column(column).is_none())
                    .collect();
                ColumnCheck { task, missing }
            })
            .collect()
    }

    /// Score one task over the whole table
    pub fn run_task(&self, table: &ParticipantTable, task: Task) -> Result<TaskReport, AnalysisError> {
        let schema = table.schema();
        let id_column = schema.require(task.as_str(), &self.config.id_column)?;
        let analyzer = analyzer_for(task, &self.config, schema)?;

        debug!("{task}: scoring {} participants", table.len());
        let analyses = analyze_table(analyzer.as_ref(), table, id_column);
        let report = build_report(analyzer.as_ref(), &analyses, &self.config);
        info!(
            "{task}: {} of {} participants valid",
            report.valid_participants, report.participants
        );
        Ok(report)
    }

    /// Load `input`, score every task in `tasks` and write the reports under
    /// `output_dir`. Stops at the first fatal error.
    pub fn run(
        &self,
        input: &Path,
        output_dir: &Path,
        tasks: &[Task],
    ) -> Result<Vec<ReportManifest>, AnalysisError> {
        let table = self.load(input)?;
        let writer = ReportWriter::new(output_dir);

        tasks
            .iter()
            .map(|&task| {
                let report = self.run_task(&table, task)?;
                writer.write(&report, input)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MANIFEST_FILE;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SST_EXPORT: &str = "\
ResponseId,list_assignment,main_sentence_interpretations,main_total_completed
Response ID,List,Interpretations,Completed
ImportId,ImportId,ImportId,ImportId
R_1,1,negative_D;positive;mixed;negative_GA,4
R_2,2,,
R_3,1.0,positive;positive,2
";

    fn write_input(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("export.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    fn table(contents: &str) -> ParticipantTable {
        ParticipantTable::from_reader(contents.as_bytes(), 2).unwrap()
    }

    #[test]
    fn test_run_writes_task_reports() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, SST_EXPORT);
        let output = dir.path().join("out");

        let manifests = AnalysisProcessor::new()
            .run(&input, &output, &[Task::Sst])
            .unwrap();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].task, "sst");
        assert_eq!(manifests[0].participants, 3);
        assert_eq!(manifests[0].valid_participants, 2);
        assert_eq!(
            manifests[0].sheets,
            vec!["results.csv", "summary.csv", "summary_by_list.csv"]
        );

        let task_dir = output.join("sst");
        assert!(task_dir.join(MANIFEST_FILE).exists());

        let results = fs::read_to_string(task_dir.join("results.csv")).unwrap();
        let lines: Vec<&str> = results.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ResponseId,List_Assignment,"));
        assert!(lines[1].starts_with("R_1,1,4,"));
        assert_eq!(lines[2], "R_2,2,NA,NA,NA,NA,NA,NA,NA,NA,No data");
        assert!(lines[3].starts_with("R_3,1,2,"));
    }

    #[test]
    fn test_failed_participant_becomes_error_row() {
        let export = "\
ResponseId,__js_responses,__js_reaction_times,__js_scenario_types,__js_word_types
meta,meta,meta,meta,meta
meta,meta,meta,meta,meta
R_1,,,,
R_2,r,500,depression,negative
";
        let report = AnalysisProcessor::new()
            .run_task(&table(export), Task::WsapOriginal)
            .unwrap();

        let results = report.sheet("results").unwrap();
        assert_eq!(results.rows.len(), 2);
        assert_eq!(results.rows[0][0], "R_1");
        assert_eq!(
            results.rows[0].last().map(String::as_str),
            Some("Error: No trial data available")
        );
        assert!(results.rows[0][1..results.rows[0].len() - 1]
            .iter()
            .all(|cell| cell == "NA"));
        assert_eq!(results.rows[1][0], "R_2");
        assert!(report.sheet("quality").is_some());
        assert_eq!(
            report.sheet("ddm_trials").unwrap().rows,
            vec![vec!["R_2", "1", "r", "500", "depression", "negative", "1"]]
        );
    }

    #[test]
    fn test_invalid_utf8_participant_does_not_stop_scoring() {
        let mut bytes = SST_EXPORT.as_bytes().to_vec();
        bytes.extend_from_slice(b"R_4,2,");
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(b",1\n");

        let table = ParticipantTable::from_reader(bytes.as_slice(), 2).unwrap();
        let report = AnalysisProcessor::new().run_task(&table, Task::Sst).unwrap();

        let results = report.sheet("results").unwrap();
        let ids: Vec<&str> = results.rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(ids, vec!["R_1", "R_2", "R_3", "R_4"]);
        assert_eq!(report.participants, 4);
    }

    #[test]
    fn test_missing_id_column_is_fatal() {
        let export = "\
id,main_sentence_interpretations,main_total_completed
m,m,m
m,m,m
R_1,positive,1
";
        let err = AnalysisProcessor::new()
            .run_task(&table(export), Task::Sst)
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MissingColumn { ref column, .. } if column == "ResponseId"
        ));
    }

    #[test]
    fn test_validate_lists_missing_columns() {
        let processor = AnalysisProcessor::new();
        let checks = processor.validate(&table(SST_EXPORT), &[Task::Sst, Task::Pst]);

        assert!(checks[0].is_ok());
        assert_eq!(checks[1].task, Task::Pst);
        assert_eq!(
            checks[1].missing,
            vec![
                "main_reaction_times",
                "main_word_accuracy",
                "main_scenario_types",
                "main_scenarios_completed",
            ]
        );
    }

    #[test]
    fn test_reports_are_deterministic() {
        let processor = AnalysisProcessor::new();
        let first = processor.run_task(&table(SST_EXPORT), Task::Sst).unwrap();
        let second = processor.run_task(&table(SST_EXPORT), Task::Sst).unwrap();
        for (a, b) in first.sheets.iter().zip(&second.sheets) {
            assert_eq!(a.to_csv().unwrap(), b.to_csv().unwrap());
        }
    }
}
