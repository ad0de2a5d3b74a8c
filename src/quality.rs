//! Data-quality annotation
//!
//! Compares the observed trial or item count for a participant against the
//! count the experiment platform reports as completed.

use crate::types::DataQuality;

/// Annotator for participant-level data quality labels
pub struct QualityAnnotator;

impl QualityAnnotator {
    /// Label a participant given observed and expected counts.
    ///
    /// `has_data` is false when none of the task's fields were present, which
    /// yields `NoData` regardless of the counts.
    pub fn annotate(observed: usize, expected: Option<usize>, has_data: bool) -> DataQuality {
        if !has_data {
            return DataQuality::NoData;
        }

        match expected {
            None => DataQuality::Unverified { observed },
            Some(expected) if observed == expected => DataQuality::Complete { observed, expected },
            Some(expected) => DataQuality::Mismatch { observed, expected },
        }
    }

    /// Whole-participant exclusion with an explicit reason
    pub fn excluded(reason: impl Into<String>) -> DataQuality {
        DataQuality::Excluded {
            reason: reason.into(),
        }
    }

    /// Structural failure caught at the participant boundary
    pub fn error(message: impl Into<String>) -> DataQuality {
        DataQuality::Error {
            message: message.into(),
        }
    }
}
