//! Trial-sequence parsing
//!
//! Splits a delimiter-encoded cell into an ordered sequence of typed trial
//! values. Parsing never fails: absent cells become empty sequences and tokens
//! that cannot be coerced become `Missing`.

use crate::types::{ElementType, EmptyTokenPolicy, TrialField, TrialValue};

/// How one cell should be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub delimiter: char,
    pub element_type: ElementType,
    pub policy: EmptyTokenPolicy,
    /// Lowercase text tokens before they are stored
    pub lowercase: bool,
}

impl FieldSpec {
    pub const fn text(name: &'static str, delimiter: char, policy: EmptyTokenPolicy) -> Self {
        Self {
            name,
            delimiter,
            element_type: ElementType::Text,
            policy,
            lowercase: false,
        }
    }

    pub const fn real(name: &'static str, delimiter: char, policy: EmptyTokenPolicy) -> Self {
        Self {
            name,
            delimiter,
            element_type: ElementType::Real,
            policy,
            lowercase: false,
        }
    }

    pub const fn lowercased(mut self) -> Self {
        self.lowercase = true;
        self
    }
}

/// Parser for delimiter-encoded trial cells
pub struct TrialParser;

impl TrialParser {
    /// Parse a raw cell into a sequence of trial values
    pub fn parse(
        raw_cell: Option<&str>,
        delimiter: char,
        element_type: ElementType,
        policy: EmptyTokenPolicy,
    ) -> Vec<TrialValue> {
        let raw = match raw_cell.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Vec::new(),
        };

        raw.split(delimiter)
            .map(str::trim)
            .filter_map(|token| {
                if token.is_empty() {
                    return match policy {
                        EmptyTokenPolicy::Drop => None,
                        EmptyTokenPolicy::Retain => Some(TrialValue::Missing),
                    };
                }
                Some(coerce_token(token, element_type))
            })
            .collect()
    }

    /// Parse a cell according to a field spec
    pub fn parse_field(raw_cell: Option<&str>, spec: &FieldSpec) -> TrialField {
        let mut values = Self::parse(raw_cell, spec.delimiter, spec.element_type, spec.policy);
        if spec.lowercase {
            for value in values.iter_mut() {
                if let TrialValue::Text(s) = value {
                    *s = s.to_lowercase();
                }
            }
        }
        TrialField::new(spec.name, values)
    }
}

/// Coerce a non-empty token to the declared element type
fn coerce_token(token: &str, element_type: ElementType) -> TrialValue {
    match element_type {
        ElementType::Text => TrialValue::Text(token.to_string()),
        ElementType::Real => parse_real(token)
            .map(TrialValue::Real)
            .unwrap_or(TrialValue::Missing),
    }
}

/// Parse a finite floating-point number; anything else is `None`
pub fn parse_real(token: &str) -> Option<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a non-negative integral count such as "20" or "20.0"
pub fn parse_count(raw: Option<&str>) -> Option<usize> {
    let value = parse_real(raw?)?;
    if value >= 0.0 && value.fract() == 0.0 {
        Some(value as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_blank_cells_are_empty() {
        for cell in [None, Some(""), Some("   "), Some("\t")] {
            let values =
                TrialParser::parse(cell, ';', ElementType::Real, EmptyTokenPolicy::Retain);
            assert!(values.is_empty());
        }
    }

    #[test]
    fn test_real_coercion_failure_becomes_missing() {
        let values =
            TrialParser::parse(Some("2;5;x;8"), ';', ElementType::Real, EmptyTokenPolicy::Retain);
        assert_eq!(
            values,
            vec![
                TrialValue::Real(2.0),
                TrialValue::Real(5.0),
                TrialValue::Missing,
                TrialValue::Real(8.0),
            ]
        );
    }

    #[test]
    fn test_empty_token_policies() {
        let raw = Some("a; ;b;");
        let dropped = TrialParser::parse(raw, ';', ElementType::Text, EmptyTokenPolicy::Drop);
        assert_eq!(dropped.len(), 2);

        let retained = TrialParser::parse(raw, ';', ElementType::Text, EmptyTokenPolicy::Retain);
        assert_eq!(retained.len(), 4);
        assert!(retained[1].is_missing());
        assert!(retained[3].is_missing());
    }

    #[test]
    fn test_tokens_are_trimmed() {
        let values =
            TrialParser::parse(Some(" r , u ,r"), ',', ElementType::Text, EmptyTokenPolicy::Retain);
        assert_eq!(values[0].as_text(), Some("r"));
        assert_eq!(values[1].as_text(), Some("u"));
        assert_eq!(values[2].as_text(), Some("r"));
    }

    #[test]
    fn test_non_finite_reals_are_missing() {
        let values = TrialParser::parse(
            Some("NaN;inf;12.5"),
            ';',
            ElementType::Real,
            EmptyTokenPolicy::Retain,
        );
        assert!(values[0].is_missing());
        assert!(values[1].is_missing());
        assert_eq!(values[2].as_real(), Some(12.5));
    }

    #[test]
    fn test_parse_field_lowercases_text() {
        let spec = FieldSpec::text("scenario_type", ';', EmptyTokenPolicy::Drop).lowercased();
        let field = TrialParser::parse_field(Some("Anxiety;POSITIVE"), &spec);
        assert_eq!(field.name, "scenario_type");
        assert_eq!(field.values[0].as_text(), Some("anxiety"));
        assert_eq!(field.values[1].as_text(), Some("positive"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some("20")), Some(20));
        assert_eq!(parse_count(Some("20.0")), Some(20));
        assert_eq!(parse_count(Some("20.5")), None);
        assert_eq!(parse_count(Some("-1")), None);
        assert_eq!(parse_count(Some("n/a")), None);
        assert_eq!(parse_count(None), None);
    }

    #[test]
    fn test_arbitrary_text_never_panics() {
        for raw in [";;;", "\u{0}", "1e999;-1e999", "🙂;,", ";"] {
            let _ = TrialParser::parse(Some(raw), ';', ElementType::Real, EmptyTokenPolicy::Retain);
            let _ = TrialParser::parse(Some(raw), ',', ElementType::Text, EmptyTokenPolicy::Drop);
        }
    }
}
