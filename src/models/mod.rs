pub mod product;
pub mod user;

use std::collections::BTreeMap;

use serde::Serialize;

/// Per-field validation messages, rendered as `{"errors": {"field": [...]}}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

pub(crate) fn check_length(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: Option<usize>,
) {
    let len = value.chars().count();
    match max {
        Some(max) if len < min || len > max => {
            errors.add(field, format!("Length must be between {min} and {max}."))
        }
        None if len < min => errors.add(field, format!("Shorter than minimum length {min}.")),
        _ => {}
    }
}
