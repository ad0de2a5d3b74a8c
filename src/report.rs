//! Report sheets and artifact writing
//!
//! A task report is a set of named sheets, each written as one CSV file under
//! `<output_dir>/<task>/`, plus a JSON manifest describing the run.

use crate::error::AnalysisError;
use crate::tasks::Task;
use crate::types::{Cell, ParticipantResult};
use crate::{COGBIAS_VERSION, PRODUCER_NAME};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the manifest written beside the sheets
pub const MANIFEST_FILE: &str = "manifest.json";

/// One output table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: &str, headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }

    /// Render the sheet as CSV bytes
    pub fn to_csv(&self) -> Result<Vec<u8>, AnalysisError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| AnalysisError::ReportError(e.to_string()))
    }
}

/// Render one result cell; missing values use `missing_token`
pub fn render_cell(cell: Option<&Cell>, missing_token: &str) -> String {
    match cell {
        Some(Cell::Score(Some(v))) => format!("{v}"),
        Some(Cell::Count(Some(n))) => n.to_string(),
        Some(Cell::Text(Some(s))) => s.clone(),
        _ => missing_token.to_string(),
    }
}

/// Build a per-participant sheet: identifier, the named columns, then the
/// quality label. Rows keep input order.
pub fn participant_sheet(
    name: &str,
    id_header: &str,
    columns: &[&str],
    results: &[ParticipantResult],
    missing_token: &str,
) -> Sheet {
    let mut headers = Vec::with_capacity(columns.len() + 2);
    headers.push(id_header);
    headers.extend_from_slice(columns);
    headers.push("Data_Quality");

    let rows = results
        .iter()
        .map(|result| {
            let mut row = Vec::with_capacity(headers.len());
            row.push(result.participant_id.clone());
            row.extend(
                columns
                    .iter()
                    .map(|column| render_cell(result.cell(column), missing_token)),
            );
            row.push(result.quality.to_string());
            row
        })
        .collect();

    Sheet::new(name, &headers, rows)
}

/// All sheets produced for one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub task: Task,
    pub participants: usize,
    pub valid_participants: usize,
    pub sheets: Vec<Sheet>,
}

impl TaskReport {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

/// Producer metadata recorded in every manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Description of one written task report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportManifest {
    pub producer: ReportProducer,
    pub task: String,
    pub input: String,
    pub computed_at_utc: String,
    pub sheets: Vec<String>,
    pub participants: usize,
    pub valid_participants: usize,
}

/// Writes task reports to disk
pub struct ReportWriter {
    output_dir: PathBuf,
    instance_id: String,
}

impl ReportWriter {
    /// Create a writer with a unique instance ID
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a writer with a specific instance ID
    pub fn with_instance_id(output_dir: impl Into<PathBuf>, instance_id: String) -> Self {
        Self {
            output_dir: output_dir.into(),
            instance_id,
        }
    }

    pub fn task_dir(&self, task: Task) -> PathBuf {
        self.output_dir.join(task.as_str())
    }

    /// Write every sheet of `report` and its manifest
    pub fn write(&self, report: &TaskReport, input: &Path) -> Result<ReportManifest, AnalysisError> {
        let dir = self.task_dir(report.task);
        fs::create_dir_all(&dir)?;

        let mut files = Vec::with_capacity(report.sheets.len());
        for sheet in &report.sheets {
            let file_name = sheet.file_name();
            write_atomic(&dir.join(&file_name), &sheet.to_csv()?)?;
            debug!("wrote {} ({} rows)", file_name, sheet.rows.len());
            files.push(file_name);
        }

        let manifest = ReportManifest {
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: COGBIAS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            task: report.task.as_str().to_string(),
            input: input.display().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            sheets: files,
            participants: report.participants,
            valid_participants: report.valid_participants,
        };

        let json = serde_json::to_string_pretty(&manifest)?;
        write_atomic(&dir.join(MANIFEST_FILE), json.as_bytes())?;
        info!("{} report written to {}", report.task, dir.display());

        Ok(manifest)
    }
}

/// Write to a temporary sibling, flush, then rename into place. The temporary
/// file is removed if any step fails.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AnalysisError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataQuality;
    use pretty_assertions::assert_eq;

    fn results() -> Vec<ParticipantResult> {
        let mut scored = ParticipantResult::new("R_1");
        scored.score("Index", Some(0.5));
        scored.count("N", Some(4));
        scored.quality = DataQuality::Complete {
            observed: 4,
            expected: 4,
        };

        let mut failed = ParticipantResult::new("R_2");
        failed.quality = DataQuality::Error {
            message: "No trial data available".to_string(),
        };

        vec![scored, failed]
    }

    #[test]
    fn test_participant_sheet_renders_missing() {
        let sheet = participant_sheet("results", "ResponseId", &["Index", "N"], &results(), "NA");
        assert_eq!(
            sheet.headers,
            vec!["ResponseId", "Index", "N", "Data_Quality"]
        );
        assert_eq!(sheet.rows[0], vec!["R_1", "0.5", "4", "Complete: 4/4"]);
        assert_eq!(
            sheet.rows[1],
            vec!["R_2", "NA", "NA", "Error: No trial data available"]
        );
    }

    #[test]
    fn test_csv_rendering() {
        let sheet = Sheet::new(
            "summary",
            &["Metric", "Value"],
            vec![
                vec!["Total Participants".to_string(), "2".to_string()],
                vec![String::new(), String::new()],
            ],
        );
        let csv = String::from_utf8(sheet.to_csv().unwrap()).unwrap();
        assert!(csv.starts_with("Metric,Value\nTotal Participants,2\n"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_writer_outputs_sheets_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::with_instance_id(dir.path(), "run-1".to_string());
        let report = TaskReport {
            task: Task::Pst,
            participants: 2,
            valid_participants: 1,
            sheets: vec![participant_sheet(
                "results",
                "ResponseId",
                &["Index"],
                &results(),
                "NA",
            )],
        };

        let manifest = writer.write(&report, Path::new("input.csv")).unwrap();
        assert_eq!(manifest.producer.instance_id, "run-1");
        assert_eq!(manifest.sheets, vec!["results.csv"]);

        let task_dir = dir.path().join("pst");
        let written = fs::read_to_string(task_dir.join("results.csv")).unwrap();
        assert!(written.starts_with("ResponseId,Index,Data_Quality\n"));

        let json = fs::read_to_string(task_dir.join(MANIFEST_FILE)).unwrap();
        let parsed: ReportManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);

        let leftovers: Vec<_> = fs::read_dir(&task_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let task_dir = dir.path().join("pst");
        // A directory squatting on the sheet's path makes the final rename fail
        fs::create_dir_all(task_dir.join("results.csv")).unwrap();

        let writer = ReportWriter::new(dir.path());
        let report = TaskReport {
            task: Task::Pst,
            participants: 2,
            valid_participants: 1,
            sheets: vec![participant_sheet("results", "ResponseId", &["Index"], &results(), "NA")],
        };

        let err = writer.write(&report, Path::new("input.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));

        let mut entries: Vec<String> = fs::read_dir(&task_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["results.csv"]);
    }

    #[test]
    fn test_output_dir_that_is_a_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"not a directory").unwrap();

        let writer = ReportWriter::new(&blocker);
        let report = TaskReport {
            task: Task::Sst,
            participants: 0,
            valid_participants: 0,
            sheets: Vec::new(),
        };

        assert!(matches!(
            writer.write(&report, Path::new("input.csv")),
            Err(AnalysisError::Io(_))
        ));
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
    }

    #[test]
    fn test_rewrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let report = TaskReport {
            task: Task::Sst,
            participants: 2,
            valid_participants: 1,
            sheets: vec![participant_sheet("results", "ResponseId", &["Index"], &results(), "NA")],
        };

        writer.write(&report, Path::new("input.csv")).unwrap();
        let first = fs::read(dir.path().join("sst/results.csv")).unwrap();
        writer.write(&report, Path::new("input.csv")).unwrap();
        let second = fs::read(dir.path().join("sst/results.csv")).unwrap();
        assert_eq!(first, second);
    }
}
