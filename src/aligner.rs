//! Positional trial alignment
//!
//! Joins independently parsed trial fields by position. Fields shorter than
//! the longest one contribute `Missing` for their trailing positions.

use crate::types::{TrialField, TrialRecord, TrialValue};

/// Aligner for combining parsed fields into trial records
pub struct TrialAligner;

impl TrialAligner {
    /// Align fields into one record per trial position
    pub fn align(fields: &[TrialField]) -> Vec<TrialRecord> {
        let n_trials = fields.iter().map(TrialField::len).max().unwrap_or(0);

        (0..n_trials)
            .map(|index| TrialRecord {
                index,
                fields: fields
                    .iter()
                    .map(|field| {
                        let value = field
                            .values
                            .get(index)
                            .cloned()
                            .unwrap_or(TrialValue::Missing);
                        (field.name, value)
                    })
                    .collect(),
            })
            .collect()
    }
}
