//! Custom validation functions for configuration.

use validator::ValidationError;

/// Validate that a model-name filter is a compilable regular expression.
pub fn validate_pattern(pattern: &str) -> Result<(), ValidationError> {
    if pattern.is_empty() {
        return Err(ValidationError::new("empty_pattern"));
    }
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_pattern"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_default_model_pattern() {
        validate_pattern(r"[\w|\s]*").unwrap();
    }

    #[test]
    fn rejects_unbalanced_regex() {
        assert!(validate_pattern(r"model_(").is_err());
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(validate_pattern("").is_err());
    }
}
