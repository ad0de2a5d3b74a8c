//! Participant table loading
//!
//! Reads the experiment platform export: one header row, a configurable number
//! of metadata rows, then one row per participant. Blank cells are absent.

use crate::error::AnalysisError;
use csv::ReaderBuilder;
use log::{debug, warn};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Column names of a loaded table, disambiguated in order of appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    headers: Vec<String>,
}

impl TableSchema {
    pub fn new<I, S>(raw_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = raw_headers
            .into_iter()
            .map(|h| h.as_ref().trim().to_string())
            .collect();
        Self {
            headers: dedupe_headers(&raw),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Resolve a required column or fail with the task that needed it
    pub fn require(&self, task: &str, name: &str) -> Result<usize, AnalysisError> {
        self.column(name).ok_or_else(|| AnalysisError::MissingColumn {
            task: task.to_string(),
            column: name.to_string(),
        })
    }
}

/// Suffix repeated header names with `.1`, `.2`, ... in order of appearance
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());

    for name in raw {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }

    headers
}

/// One participant record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRow {
    /// Line in the source file, for diagnostics
    pub line: u64,
    cells: Vec<Option<String>>,
}

impl ParticipantRow {
    pub fn new<I, S>(line: u64, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| {
                let cell = cell.as_ref();
                if cell.trim().is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        Self { line, cells }
    }

    /// Raw cell value; blank and out-of-range cells are `None`
    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|cell| cell.as_deref())
    }
}

/// A fully loaded participant table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantTable {
    schema: TableSchema,
    rows: Vec<ParticipantRow>,
}

impl ParticipantTable {
    pub fn new(schema: TableSchema, rows: Vec<ParticipantRow>) -> Self {
        Self { schema, rows }
    }

    /// Load a CSV export, skipping `metadata_rows` rows after the header.
    ///
    /// Cells are decoded lossily, so invalid UTF-8 in one participant's cell
    /// becomes replacement characters instead of failing the whole load.
    pub fn from_reader<R: Read>(reader: R, metadata_rows: usize) -> Result<Self, AnalysisError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.byte_headers()?.clone();
        if headers.is_empty() {
            return Err(AnalysisError::EmptyTable);
        }
        let schema = TableSchema::new(headers.iter().map(String::from_utf8_lossy));

        let mut rows = Vec::new();
        for (i, record) in reader.byte_records().enumerate() {
            let record = record?;
            if i < metadata_rows {
                debug!("skipping metadata row {}", i + 1);
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if std::str::from_utf8(record.as_slice()).is_err() {
                warn!("line {line}: invalid UTF-8 replaced");
            }
            rows.push(ParticipantRow::new(
                line,
                record.iter().map(String::from_utf8_lossy),
            ));
        }

        debug!(
            "loaded {} participant rows with {} columns",
            rows.len(),
            schema.headers().len()
        );

        Ok(Self { schema, rows })
    }

    pub fn from_path(path: &Path, metadata_rows: usize) -> Result<Self, AnalysisError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, metadata_rows)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[ParticipantRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
