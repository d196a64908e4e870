//! Identifier & validation primitives.
//!
//! Name, language, and interpreter-path are opaque wrappers constructed only
//! through a validator. Validation errors compose: wrapping adds a dotted
//! path element the way a parser would report "this went wrong inside
//! `sections['build'].config`".

use lazy_regex::regex;
use std::fmt;

/// A validation failure, optionally wrapped with the path of the structure
/// it was found under. `at` accumulates in call order as errors are wrapped
/// walking back up the call stack — the first `wrap` call is innermost,
/// closest to the root cause — and [`ValidationError::render`] joins them in
/// that same order, innermost segment first.
#[derive(Debug)]
pub struct ValidationError {
    at: Vec<String>,
    inner: String,
}

impl ValidationError {
    pub fn new(inner: impl fmt::Display) -> Self {
        Self {
            at: Vec::new(),
            inner: inner.to_string(),
        }
    }

    /// Wraps `self` with an additional path segment, as if it had just been
    /// discovered one level further out (e.g. the field `config` inside
    /// `sections['build']`).
    pub fn wrap(mut self, at: impl Into<String>) -> Self {
        let at = at.into();
        let at = at.trim_matches('.').to_string();
        self.at.push(at);
        self
    }

    pub fn render(&self) -> String {
        if self.at.is_empty() {
            format!("validation error: {}", self.inner)
        } else {
            format!("validation error in '{}': {}", self.at.join("."), self.inner)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for ValidationError {}

/// Wraps any error-like value into a [`ValidationError`] under `at`,
/// composing with an existing `ValidationError` rather than nesting.
pub fn wrap(at: impl Into<String>, err: ValidationError) -> ValidationError {
    err.wrap(at)
}

/// Checks that a name is non-empty.
pub fn name(value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("name must not be empty"));
    }
    Ok(value.to_string())
}

/// Checks that a language tag matches `^[a-z]+$`.
pub fn language(value: &str) -> Result<String, ValidationError> {
    let lowercase_alpha = regex!("^[a-z]+$");
    if !lowercase_alpha.is_match(value) {
        return Err(ValidationError::new(format!(
            "'{value}' is not satisfied by regular expression '^[a-z]+$'"
        )));
    }
    Ok(value.to_string())
}

/// Interpreter paths are opaque; empty means "resolve from language" and is
/// always valid.
pub fn interpreter_path(value: &str) -> Result<String, ValidationError> {
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn wrapping_composes_innermost_first() {
        let e = wrap("x", wrap("y", ValidationError::new("root cause")));
        assert_eq!(e.render(), "validation error in 'y.x': root cause");
    }

    #[test]
    fn unwrapped_error_has_no_path() {
        let e = ValidationError::new("root cause");
        assert_eq!(e.render(), "validation error: root cause");
    }

    #[rstest]
    #[case::lowercase_alpha("sh", true)]
    #[case::mixed_case("Sh", false)]
    #[case::digits("sh2", false)]
    #[case::empty("", false)]
    #[case::hyphen("py-thon", false)]
    fn language_validation(#[case] value: &str, #[case] expect_ok: bool) {
        assert_eq!(language(value).is_ok(), expect_ok);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(name("").is_err());
    }

    #[test]
    fn empty_interpreter_path_is_allowed() {
        assert_eq!(interpreter_path("").unwrap(), "");
    }
}
