use std::fmt;
use thiserror::Error;

/// Every field rule that failed for a candidate payload, in field order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .0.join(", "))]
pub struct ValidationError(Vec<String>);

impl ValidationError {
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct FieldErrors(Vec<String>);

impl FieldErrors {
    /// Records the error of a failed rule and yields the value of a passing one.
    pub(crate) fn check<T, E: fmt::Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.0.push(err.to_string());
                None
            }
        }
    }

    pub(crate) fn into_error(self) -> ValidationError {
        ValidationError(self.0)
    }
}

/// Trims `raw` and checks that the result holds between 1 and `max` characters.
pub(crate) fn bounded_text<E>(raw: &str, max: usize, empty: E, too_long: E) -> Result<String, E> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        Err(empty)
    } else if len > max {
        Err(too_long)
    } else {
        Ok(trimmed.into())
    }
}
