//! Configuration error types
//!
//! Every failure while loading analysis options or the rule table lands here.
//! Rules are trusted input, so any malformed entry aborts startup.

use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Range validation error
    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    /// Unknown keyword in a rule entry (action, jump kind, index keyword)
    #[error("Unknown value '{field}' in section '{section}'. {suggestion}")]
    UnknownField {
        field: String,
        section: String,
        suggestion: String,
        valid_fields: Vec<String>,
    },

    /// Missing version field in YAML
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    /// Unsupported version
    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    /// Unknown preset name
    #[error("Unknown preset '{0}'. Valid presets: fast, balanced, thorough")]
    UnknownPreset(String),

    /// Rule entry that cannot be interpreted
    #[error("Malformed {section} rule '{entry}': {reason}")]
    MalformedRule {
        section: String,
        entry: String,
        reason: String,
    },

    /// Rule names a method the program does not contain (strict mode)
    #[error("Method {signature} referenced by {section} rule not found in program")]
    MissingMethod { section: String, signature: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a range error with a hint
    pub fn range_with_hint(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            hint: hint.into(),
        }
    }

    /// Create an unknown keyword error with suggestion
    pub fn unknown_field_with_suggestion(
        field: impl Into<String>,
        section: impl Into<String>,
        valid_fields: &[&str],
    ) -> Self {
        let field = field.into();
        let valid_fields: Vec<String> = valid_fields.iter().map(|s| s.to_string()).collect();
        let suggestion = find_closest_match(&field, &valid_fields);

        Self::UnknownField {
            field,
            section: section.into(),
            suggestion,
            valid_fields,
        }
    }

    /// Create a malformed rule error
    pub fn malformed(
        section: impl Into<String>,
        entry: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRule {
            section: section.into(),
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

/// Find closest match using simple edit distance
fn find_closest_match(target: &str, candidates: &[String]) -> String {
    match candidates
        .iter()
        .min_by_key(|candidate| levenshtein_distance(target, candidate))
    {
        Some(closest) => format!("Did you mean '{}'?", closest),
        None => "No valid values available".to_string(),
    }
}

fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let b: Vec<char> = s2.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, c1) in s1.chars().enumerate() {
        cur[0] = i + 1;
        for (j, c2) in b.iter().enumerate() {
            let cost = usize::from(c1 != *c2);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("inference", "inference"), 0);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
    }

    #[test]
    fn test_unknown_jump_suggestion() {
        let err = ConfigError::unknown_field_with_suggestion(
            "constructer",
            "imitates",
            &["constructor", "clinit", "inference"],
        );
        let msg = err.to_string();
        assert!(msg.contains("constructer"));
        assert!(msg.contains("imitates"));
        assert!(msg.contains("Did you mean 'constructor'"));
    }

    #[test]
    fn test_closest_match_empty_candidates() {
        let suggestion = find_closest_match("max_len", &[]);
        assert!(suggestion.contains("No valid values"));
    }

    #[test]
    fn test_range_error_formatting() {
        let err = ConfigError::range_with_hint("max_len", 0, 2, 64, "Chains need at least two hops");
        let msg = err.to_string();
        assert!(msg.contains("max_len"));
        assert!(msg.contains("2..=64"));
        assert!(msg.contains("at least two hops"));
    }

    #[test]
    fn test_malformed_rule_message() {
        let err = ConfigError::malformed("sinks", "<A: void f()>", "index 'x' is not a number");
        assert_eq!(
            err.to_string(),
            "Malformed sinks rule '<A: void f()>': index 'x' is not a number"
        );
    }

    #[test]
    fn test_unsupported_version_error() {
        let err = ConfigError::UnsupportedVersion {
            found: 2,
            supported: vec![1],
        };
        assert!(err.to_string().contains("Supported versions: 1"));
    }
}
