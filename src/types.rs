//! Core types for the cogbias scoring pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: parsed trial values, aligned trial records, classified trials,
//! participant results and summary statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared element type of a trial field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Text,
    Real,
}

/// What to do with empty tokens produced by consecutive or trailing delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyTokenPolicy {
    /// Discard empty tokens (field has no positional meaning for them)
    Drop,
    /// Keep empty tokens as `Missing` so positions stay aligned
    Retain,
}

/// A single parsed token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrialValue {
    Real(f64),
    Text(String),
    Missing,
}

/// Shared missing marker for lookups of absent fields
pub static MISSING: TrialValue = TrialValue::Missing;

impl TrialValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, TrialValue::Missing)
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            TrialValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TrialValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Case-insensitive equality against a text sentinel. `Missing` never matches.
    pub fn matches(&self, expected: &str) -> bool {
        self.as_text()
            .map(|s| s.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }
}

impl fmt::Display for TrialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialValue::Real(v) => write!(f, "{v}"),
            TrialValue::Text(s) => f.write_str(s),
            TrialValue::Missing => Ok(()),
        }
    }
}

/// A named, ordered sequence of parsed tokens from one cell
#[derive(Debug, Clone, PartialEq)]
pub struct TrialField {
    pub name: &'static str,
    pub values: Vec<TrialValue>,
}

impl TrialField {
    pub fn new(name: &'static str, values: Vec<TrialValue>) -> Self {
        Self { name, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One aligned trial for one participant
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    /// Zero-based position within the participant's trial sequence
    pub index: usize,
    pub fields: Vec<(&'static str, TrialValue)>,
}

impl TrialRecord {
    /// Value of a named field; unknown fields read as `Missing`
    pub fn get(&self, name: &str) -> &TrialValue {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
            .unwrap_or(&MISSING)
    }
}

/// Stimulus / interpretation category assigned to a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Anxiety,
    Depression,
    /// Negative interpretation, depression-relevant
    NegativeD,
    /// Negative interpretation, general-anxiety-relevant
    NegativeGa,
    Positive,
    Benign,
    Mixed,
    Unclear,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Anxiety => "anxiety",
            Category::Depression => "depression",
            Category::NegativeD => "negative_D",
            Category::NegativeGa => "negative_GA",
            Category::Positive => "positive",
            Category::Benign => "benign",
            Category::Mixed => "mixed",
            Category::Unclear => "unclear",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Category::Anxiety | Category::Depression | Category::NegativeD | Category::NegativeGa
        )
    }

    pub fn is_benign(&self) -> bool {
        matches!(self, Category::Positive | Category::Benign)
    }
}

/// Endorse / reject judgement attached to a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endorsement {
    Endorsed,
    Rejected,
    /// A response that is neither marker
    Other,
}

/// A trial that passed the inclusion filter, with exactly one category
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTrial {
    pub index: usize,
    pub category: Category,
    pub endorsement: Option<Endorsement>,
    pub rt: Option<f64>,
}

/// Participant-level data quality label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DataQuality {
    /// No task fields were present at all
    NoData,
    Complete { observed: usize, expected: usize },
    Mismatch { observed: usize, expected: usize },
    /// Expected count absent or unparsable
    Unverified { observed: usize },
    Excluded { reason: String },
    Error { message: String },
}

impl DataQuality {
    /// Whether the participant produced any scoreable data
    pub fn has_data(&self) -> bool {
        !matches!(self, DataQuality::NoData | DataQuality::Error { .. })
    }
}

impl fmt::Display for DataQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQuality::NoData => f.write_str("No data"),
            DataQuality::Complete { observed, expected } => {
                write!(f, "Complete: {observed}/{expected}")
            }
            DataQuality::Mismatch { observed, expected } => {
                write!(f, "Mismatch: {observed} of {expected} expected")
            }
            DataQuality::Unverified { observed } => write!(f, "Observed: {observed} of ? expected"),
            DataQuality::Excluded { reason } => write!(f, "Excluded: {reason}"),
            DataQuality::Error { message } => write!(f, "Error: {message}"),
        }
    }
}

/// One cell of a participant result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Score(Option<f64>),
    Count(Option<usize>),
    Text(Option<String>),
}

/// One output row per participant
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantResult {
    pub participant_id: String,
    /// Normalized list/condition label, if the task is stratified
    pub condition: Option<String>,
    /// Ordered named cells (indices, counts, descriptive text)
    pub columns: Vec<(&'static str, Cell)>,
    pub quality: DataQuality,
}

impl ParticipantResult {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            condition: None,
            columns: Vec::new(),
            quality: DataQuality::NoData,
        }
    }

    pub fn push(&mut self, name: &'static str, cell: Cell) {
        self.columns.push((name, cell));
    }

    pub fn score(&mut self, name: &'static str, value: Option<f64>) {
        self.push(name, Cell::Score(value));
    }

    pub fn count(&mut self, name: &'static str, value: Option<usize>) {
        self.push(name, Cell::Count(value));
    }

    pub fn text(&mut self, name: &'static str, value: Option<String>) {
        self.push(name, Cell::Text(value));
    }

    /// Numeric value of a score or count column; `None` if absent or missing
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .and_then(|(_, cell)| match cell {
                Cell::Score(v) => *v,
                Cell::Count(v) => v.map(|c| c as f64),
                Cell::Text(_) => None,
            })
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, cell)| cell)
    }
}

/// Descriptive statistics over participants with a present metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample (n-1) standard deviation
    pub sd: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
}

/// Summary statistics for one condition group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub stats: SummaryStatistics,
}
