//! Trial inclusion and classification
//!
//! Applies per-task eligibility rules to aligned trial records and assigns each
//! eligible trial a category. Rules only read fields present in the record;
//! `Missing` fails every equality or membership test.

use crate::types::{Category, ClassifiedTrial, Endorsement, TrialRecord, TrialValue};

/// Case-insensitive lookup table from raw labels to categories
#[derive(Debug, Clone, Copy)]
pub struct CategoryMap {
    entries: &'static [(&'static str, Category)],
}

impl CategoryMap {
    pub const fn new(entries: &'static [(&'static str, Category)]) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, label: &str) -> Option<Category> {
        let label = label.trim();
        self.entries
            .iter()
            .find(|(raw, _)| raw.eq_ignore_ascii_case(label))
            .map(|(_, category)| *category)
    }

    pub fn lookup_value(&self, value: &TrialValue) -> Option<Category> {
        value.as_text().and_then(|label| self.lookup(label))
    }
}

/// Trial is countable only if `field` equals `sentinel` (case-insensitive)
#[derive(Debug, Clone, Copy)]
pub struct AccuracyGate {
    pub field: &'static str,
    pub sentinel: &'static str,
}

impl AccuracyGate {
    pub fn passes(&self, trial: &TrialRecord) -> bool {
        trial.get(self.field).matches(self.sentinel)
    }
}

/// Picks one member of a paired-options cell based on a choice marker
#[derive(Debug, Clone, Copy)]
pub struct ChoicePair {
    pub choice_field: &'static str,
    pub options_field: &'static str,
    pub left_marker: &'static str,
    pub right_marker: &'static str,
    pub separator: char,
}

impl ChoicePair {
    /// The chosen option label, or `None` if the choice cannot be resolved.
    ///
    /// A cell without the separator is a degenerate single option and is the
    /// chosen label whatever the marker. With two options, a marker that is
    /// neither `left_marker` nor `right_marker` (a timeout, say) leaves the
    /// choice unresolved rather than falling through to the right option.
    pub fn chosen<'a>(&self, trial: &'a TrialRecord) -> Option<&'a str> {
        let choice = trial.get(self.choice_field).as_text()?;
        let options = trial.get(self.options_field).as_text()?;

        let parts: Vec<&str> = options.split(self.separator).map(str::trim).collect();
        if parts.len() != 2 {
            return parts.first().copied().filter(|label| !label.is_empty());
        }

        if choice.eq_ignore_ascii_case(self.left_marker) {
            Some(parts[0])
        } else if choice.eq_ignore_ascii_case(self.right_marker) {
            Some(parts[1])
        } else {
            None
        }
    }
}

/// Maps a response field onto endorse / reject markers
#[derive(Debug, Clone, Copy)]
pub struct EndorsementRule {
    pub field: &'static str,
    pub endorse_marker: &'static str,
    pub reject_marker: &'static str,
}

impl EndorsementRule {
    pub fn endorsement(&self, trial: &TrialRecord) -> Option<Endorsement> {
        let value = trial.get(self.field);
        if value.is_missing() {
            None
        } else if value.matches(self.endorse_marker) {
            Some(Endorsement::Endorsed)
        } else if value.matches(self.reject_marker) {
            Some(Endorsement::Rejected)
        } else {
            Some(Endorsement::Other)
        }
    }
}

/// Eligibility requirement evaluated before categorization
#[derive(Debug, Clone, Copy)]
pub enum Requirement {
    Gate(AccuracyGate),
    Present(&'static str),
}

impl Requirement {
    fn holds(&self, trial: &TrialRecord) -> bool {
        match self {
            Requirement::Gate(gate) => gate.passes(trial),
            Requirement::Present(field) => !trial.get(field).is_missing(),
        }
    }
}

/// Where a trial's category comes from
#[derive(Debug, Clone, Copy)]
pub enum CategorySource {
    /// Read a type field; a missing or unknown label leaves the trial uncategorized
    Field { field: &'static str, map: CategoryMap },
    /// Resolve a choice pair; an unresolved choice excludes the trial
    Choice { pair: ChoicePair, map: CategoryMap },
}

/// Complete per-task rule set
#[derive(Debug, Clone, Copy)]
pub struct ClassificationRules {
    pub requirements: &'static [Requirement],
    pub category: CategorySource,
    pub endorsement: Option<EndorsementRule>,
    pub rt_field: Option<&'static str>,
}

/// Result of running one trial through the rules
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// Failed an eligibility requirement
    Excluded,
    /// Eligible, but matched none of the task's categories
    Uncategorized {
        index: usize,
        label: Option<String>,
        rt: Option<f64>,
    },
    Classified(ClassifiedTrial),
}

impl TrialOutcome {
    pub fn is_included(&self) -> bool {
        !matches!(self, TrialOutcome::Excluded)
    }

    pub fn rt(&self) -> Option<f64> {
        match self {
            TrialOutcome::Excluded => None,
            TrialOutcome::Uncategorized { rt, .. } => *rt,
            TrialOutcome::Classified(trial) => trial.rt,
        }
    }

    pub fn classified(&self) -> Option<&ClassifiedTrial> {
        match self {
            TrialOutcome::Classified(trial) => Some(trial),
            _ => None,
        }
    }
}

/// Classify one trial
pub fn classify(trial: &TrialRecord, rules: &ClassificationRules) -> TrialOutcome {
    if !rules.requirements.iter().all(|req| req.holds(trial)) {
        return TrialOutcome::Excluded;
    }

    let rt = rules.rt_field.and_then(|field| trial.get(field).as_real());
    let endorsement = rules.endorsement.and_then(|rule| rule.endorsement(trial));

    let (label, category) = match rules.category {
        CategorySource::Field { field, map } => {
            let value = trial.get(field);
            (value.as_text().map(str::to_string), map.lookup_value(value))
        }
        CategorySource::Choice { pair, map } => match pair.chosen(trial) {
            Some(label) => (Some(label.to_string()), map.lookup(label)),
            None => return TrialOutcome::Excluded,
        },
    };

    match category {
        Some(category) => TrialOutcome::Classified(ClassifiedTrial {
            index: trial.index,
            category,
            endorsement,
            rt,
        }),
        None => TrialOutcome::Uncategorized {
            index: trial.index,
            label,
            rt,
        },
    }
}

/// Classify every trial, preserving order
pub fn classify_all(trials: &[TrialRecord], rules: &ClassificationRules) -> Vec<TrialOutcome> {
    trials.iter().map(|trial| classify(trial, rules)).collect()
}

/// Number of classified trials satisfying `predicate`
pub fn count_where<F>(outcomes: &[TrialOutcome], predicate: F) -> usize
where
    F: Fn(&ClassifiedTrial) -> bool,
{
    outcomes
        .iter()
        .filter_map(TrialOutcome::classified)
        .filter(|trial| predicate(trial))
        .count()
}

/// Reaction times of classified trials satisfying `predicate` that have an RT
pub fn rts_where<F>(outcomes: &[TrialOutcome], predicate: F) -> Vec<f64>
where
    F: Fn(&ClassifiedTrial) -> bool,
{
    outcomes
        .iter()
        .filter_map(TrialOutcome::classified)
        .filter(|trial| predicate(trial))
        .filter_map(|trial| trial.rt)
        .collect()
}
