//! Analysis configuration
//!
//! Column names, delimiters and input layout for every task. Defaults match
//! the experiment platform export; any subset can be overridden from JSON.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Default number of metadata rows between the header and the first data row
pub const DEFAULT_METADATA_ROWS: usize = 2;

/// Token written for missing values in output tables
pub const DEFAULT_MISSING_TOKEN: &str = "NA";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Participant identifier column
    pub id_column: String,
    /// List / condition assignment column
    pub condition_column: String,
    /// Rows to skip after the header row
    pub metadata_rows: usize,
    /// Output token for missing values
    pub missing_token: String,
    pub ast: AstConfig,
    pub pst: PstConfig,
    pub sst: SstConfig,
    pub wsap_original: WsapOriginalConfig,
    pub wsap_new: WsapNewConfig,
    pub questionnaires: QuestionnaireConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            id_column: "ResponseId".to_string(),
            condition_column: "list_assignment".to_string(),
            metadata_rows: DEFAULT_METADATA_ROWS,
            missing_token: DEFAULT_MISSING_TOKEN.to_string(),
            ast: AstConfig::default(),
            pst: PstConfig::default(),
            sst: SstConfig::default(),
            wsap_original: WsapOriginalConfig::default(),
            wsap_new: WsapNewConfig::default(),
            questionnaires: QuestionnaireConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from JSON; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.id_column.trim().is_empty() {
            return Err(AnalysisError::InvalidConfig(
                "id_column must not be empty".to_string(),
            ));
        }
        if self.wsap_new.pair_separator == self.wsap_new.delimiter {
            return Err(AnalysisError::InvalidConfig(
                "wsap_new.pair_separator must differ from wsap_new.delimiter".to_string(),
            ));
        }
        Ok(())
    }
}

/// AST outcome-rating columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AstConfig {
    pub ratings_column: String,
    pub descriptions_column: String,
    pub rating_delimiter: char,
    pub description_delimiter: char,
}

impl Default for AstConfig {
    fn default() -> Self {
        Self {
            ratings_column: "main_pleasantness_ratings".to_string(),
            descriptions_column: "main_outcome_descriptions".to_string(),
            rating_delimiter: ';',
            description_delimiter: '|',
        }
    }
}

/// PST scenario columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PstConfig {
    pub reaction_times_column: String,
    pub word_accuracy_column: String,
    pub scenario_types_column: String,
    pub scenarios_completed_column: String,
    pub delimiter: char,
}

impl Default for PstConfig {
    fn default() -> Self {
        Self {
            reaction_times_column: "main_reaction_times".to_string(),
            word_accuracy_column: "main_word_accuracy".to_string(),
            scenario_types_column: "main_scenario_types".to_string(),
            scenarios_completed_column: "main_scenarios_completed".to_string(),
            delimiter: ';',
        }
    }
}

/// SST sentence-interpretation columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SstConfig {
    pub interpretations_column: String,
    pub total_completed_column: String,
    pub delimiter: char,
}

impl Default for SstConfig {
    fn default() -> Self {
        Self {
            interpretations_column: "main_sentence_interpretations".to_string(),
            total_completed_column: "main_total_completed".to_string(),
            delimiter: ';',
        }
    }
}

/// Word-sentence association paradigm, endorse/reject variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsapOriginalConfig {
    pub responses_column: String,
    pub reaction_times_column: String,
    pub scenario_types_column: String,
    pub word_types_column: String,
    pub delimiter: char,
}

impl Default for WsapOriginalConfig {
    fn default() -> Self {
        Self {
            responses_column: "__js_responses".to_string(),
            reaction_times_column: "__js_reaction_times".to_string(),
            scenario_types_column: "__js_scenario_types".to_string(),
            word_types_column: "__js_word_types".to_string(),
            delimiter: ',',
        }
    }
}

/// Word-sentence association paradigm, forced-choice variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsapNewConfig {
    pub reaction_times_column: String,
    pub valences_column: String,
    pub responses_column: String,
    pub delimiter: char,
    /// Separates the left and right option inside one valence token
    pub pair_separator: char,
}

impl Default for WsapNewConfig {
    fn default() -> Self {
        Self {
            reaction_times_column: "__js_reaction_time".to_string(),
            valences_column: "__js_valence".to_string(),
            responses_column: "__js_response".to_string(),
            delimiter: ',',
            pair_separator: '/',
        }
    }
}

/// Item columns for the questionnaires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireConfig {
    pub qids_items: Vec<String>,
    pub gad_items: Vec<String>,
    pub masq_items: Vec<String>,
}

impl Default for QuestionnaireConfig {
    fn default() -> Self {
        let names = |prefix: &str, range: std::ops::RangeInclusive<usize>, suffix: &str| {
            range
                .map(|i| format!("{prefix}{i}{suffix}"))
                .collect::<Vec<_>>()
        };

        // MASQ repeats the GAD item names in the export; the loader suffixes
        // the second occurrence with ".1".
        let mut masq_items = names("Q1_", 1..=7, ".1");
        masq_items.extend(names("Q1_", 8..=26, ""));

        Self {
            qids_items: names("Q", 2..=16, ""),
            gad_items: names("Q1_", 1..=7, ""),
            masq_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_questionnaire_columns() {
        let config = QuestionnaireConfig::default();
        assert_eq!(config.qids_items.len(), 15);
        assert_eq!(config.qids_items[0], "Q2");
        assert_eq!(config.gad_items.len(), 7);
        assert_eq!(config.masq_items.len(), 26);
        assert_eq!(config.masq_items[0], "Q1_1.1");
        assert_eq!(config.masq_items[7], "Q1_8");
        assert_eq!(config.masq_items[25], "Q1_26");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            AnalysisConfig::from_json(r#"{"id_column": "pid", "pst": {"delimiter": ","}}"#)
                .unwrap();
        assert_eq!(config.id_column, "pid");
        assert_eq!(config.pst.delimiter, ',');
        assert_eq!(config.pst.reaction_times_column, "main_reaction_times");
        assert_eq!(config.metadata_rows, DEFAULT_METADATA_ROWS);
    }

    #[test]
    fn test_roundtrip_json() {
        let config = AnalysisConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(AnalysisConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_conflicting_separators() {
        let result = AnalysisConfig::from_json(r#"{"wsap_new": {"pair_separator": ","}}"#);
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }
}
