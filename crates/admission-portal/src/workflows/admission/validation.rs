use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field-keyed validation messages, rendered as `{ field: [message] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.values().flatten().next() {
            Some(first) => f.write_str(first),
            None => f.write_str("validation failed"),
        }
    }
}

impl std::error::Error for ValidationErrors {}

fn label(field: &str) -> String {
    let last = field.rsplit('.').next().unwrap_or(field);
    last.replace('_', " ")
}

/// Records a required-field error when `value` is blank; returns whether it was present.
pub(crate) fn required(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, format!("The {} field is required.", label(field)));
        false
    } else {
        true
    }
}

pub(crate) fn max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!(
                "The {} may not be greater than {} characters.",
                label(field),
                max
            ),
        );
    }
}

pub(crate) fn required_max(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if required(errors, field, value) {
        max_len(errors, field, value, max);
    }
}

pub(crate) fn optional_max(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(value) = value {
        max_len(errors, field, value, max);
    }
}

pub(crate) fn optional_email(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
        if !is_valid_email(value) {
            errors.add(
                field,
                format!("The {} must be a valid email address.", label(field)),
            );
        }
        max_len(errors, field, value, 255);
    }
}

pub(crate) fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        required(&mut errors, "mother_name", " ");
        required_max(&mut errors, "qualifications.0.division", &"x".repeat(101), 100);
        optional_email(&mut errors, "alternate_email", Some("not-an-email"));
        optional_email(&mut errors, "email", None);

        assert_eq!(
            errors.messages("mother_name"),
            ["The mother name field is required.".to_string()]
        );
        assert_eq!(
            errors.messages("qualifications.0.division"),
            ["The division may not be greater than 100 characters.".to_string()]
        );
        assert!(errors.has("alternate_email"));
        assert!(!errors.has("email"));

        let json = serde_json::to_value(&errors).expect("serialize");
        assert!(json["mother_name"].is_array());
    }

    #[test]
    fn email_shape_checks() {
        assert!(is_valid_email("asha.k@college.edu.in"));
        assert!(!is_valid_email("asha@localhost"));
        assert!(!is_valid_email("asha k@college.edu"));
        assert!(!is_valid_email("@college.edu"));
        assert!(!is_valid_email("asha@@college.edu"));
    }
}
