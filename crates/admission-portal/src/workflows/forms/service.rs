use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use super::domain::{
    AdmissionForm, FieldType, FileValue, FormField, NewSubmission, SubmissionReceipt,
};
use super::rules::{self, FieldRule, Measure};
use super::FormRepository;
use crate::workflows::admission::repository::{Clock, RepositoryError};
use crate::workflows::admission::validation::{is_valid_email, ValidationErrors};

/// Prefix under which file fields are recorded in a submission.
pub const UPLOAD_DIRECTORY: &str = "admission_uploads";

const ACCEPTED_CHECKBOX: [&str; 4] = ["1", "on", "yes", "true"];

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Form not found.")]
    NotFound,
    #[error("This form is not accepting submissions.")]
    Closed,
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct FormService {
    forms: Arc<dyn FormRepository>,
    clock: Arc<dyn Clock>,
}

impl FormService {
    pub fn new(forms: Arc<dyn FormRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { forms, clock }
    }

    /// Active form with sections and fields in display order.
    pub fn form(&self, short_code: &str) -> Result<AdmissionForm, FormError> {
        self.forms
            .active_form(short_code.trim())?
            .map(AdmissionForm::ordered)
            .ok_or(FormError::NotFound)
    }

    pub fn submit(
        &self,
        short_code: &str,
        payload: Map<String, Value>,
    ) -> Result<SubmissionReceipt, FormError> {
        let form = self.form(short_code)?;
        let now = self.clock.now();
        if !form.is_open_at(now) {
            return Err(FormError::Closed);
        }

        let mut errors = ValidationErrors::new();
        let mut data = Map::new();
        for field in form.fields() {
            if let Some(value) = check_field(&mut errors, field, payload.get(&field.name)) {
                data.insert(field.name.clone(), value);
            }
        }
        errors.into_result()?;

        let submission = self.forms.save_submission(NewSubmission {
            admission_form_id: form.id,
            data,
            submitted_at: now,
        })?;
        info!(
            form = %form.short_code,
            submission_id = submission.id,
            "admission form submitted"
        );

        Ok(SubmissionReceipt {
            success: true,
            message: "Form submitted successfully!",
            submission_id: submission.id,
        })
    }
}

/// Validates one field and returns the value to store, if any. Keys that
/// match no field of the form are never stored.
fn check_field(errors: &mut ValidationErrors, field: &FormField, value: Option<&Value>) -> Option<Value> {
    let attribute = field.name.replace('_', " ");
    let Some(value) = value.filter(|value| is_present(field.field_type, value)) else {
        if field.is_required {
            let message = match field.field_type {
                FieldType::Checkbox => format!("The {attribute} must be accepted."),
                _ => format!("The {attribute} field is required."),
            };
            errors.add(&field.name, message);
        }
        return None;
    };

    let before = errors.messages(&field.name).len();
    let stored = match field.field_type {
        FieldType::File => match serde_json::from_value::<FileValue>(value.clone()) {
            Ok(file) if !file.storage_key.trim().is_empty() => {
                let measure = Measure::Kilobytes(file.file_size as f64 / 1024.0);
                apply_rules(errors, field, &attribute, value, measure);
                Value::String(format!(
                    "{UPLOAD_DIRECTORY}/{}",
                    file.storage_key.trim().trim_start_matches('/')
                ))
            }
            _ => {
                errors.add(&field.name, format!("The {attribute} must be a file."));
                return None;
            }
        },
        FieldType::Checkbox => Value::Bool(true),
        field_type => {
            match type_violation(field_type, field, &attribute, value) {
                Some(message) => errors.add(&field.name, message),
                None => {
                    let measure = measure(field, value);
                    apply_rules(errors, field, &attribute, value, measure);
                }
            }
            match value {
                Value::String(text) => Value::String(text.trim().to_string()),
                other => other.clone(),
            }
        }
    };

    (errors.messages(&field.name).len() == before).then_some(stored)
}

fn is_present(field_type: FieldType, value: &Value) -> bool {
    match (field_type, value) {
        (_, Value::Null) => false,
        (FieldType::Checkbox, Value::Bool(checked)) => *checked,
        (FieldType::Checkbox, Value::Number(number)) => number.as_f64() == Some(1.0),
        (FieldType::Checkbox, Value::String(text)) => {
            ACCEPTED_CHECKBOX.contains(&text.trim().to_ascii_lowercase().as_str())
        }
        (_, Value::String(text)) => !text.trim().is_empty(),
        (_, Value::Array(items)) => !items.is_empty(),
        (FieldType::File, Value::Object(object)) => object
            .get("storage_key")
            .and_then(Value::as_str)
            .is_some_and(|key| !key.trim().is_empty()),
        _ => true,
    }
}

/// Checks implied by the field type itself.
fn type_violation(
    field_type: FieldType,
    field: &FormField,
    attribute: &str,
    value: &Value,
) -> Option<String> {
    let text = rules::as_text(value);
    match field_type {
        FieldType::Email => text
            .filter(|text| is_valid_email(text))
            .is_none()
            .then(|| format!("The {attribute} must be a valid email address.")),
        FieldType::Number => rules::as_number(value)
            .is_none()
            .then(|| format!("The {attribute} must be a number.")),
        FieldType::Date => text
            .filter(|text| rules::is_date(text))
            .is_none()
            .then(|| format!("The {attribute} is not a valid date.")),
        FieldType::Select | FieldType::Radio => {
            let options = field.options.as_deref().filter(|options| !options.is_empty())?;
            text.filter(|text| options.iter().any(|option| option == text))
                .is_none()
                .then(|| format!("The selected {attribute} is invalid."))
        }
        FieldType::Text | FieldType::Textarea => text
            .is_none()
            .then(|| format!("The {attribute} must be a string.")),
        FieldType::Checkbox | FieldType::File => None,
    }
}

fn measure(field: &FormField, value: &Value) -> Measure {
    let numeric = field.field_type == FieldType::Number
        || field
            .validation_rules
            .iter()
            .any(|rule| matches!(rule, FieldRule::Numeric | FieldRule::Integer));
    match value {
        Value::Array(items) => Measure::Items(items.len()),
        _ => match rules::as_number(value).filter(|_| numeric) {
            Some(number) => Measure::Number(number),
            None => Measure::Characters(
                rules::as_text(value).map_or(0, |text| text.chars().count()),
            ),
        },
    }
}

fn apply_rules(
    errors: &mut ValidationErrors,
    field: &FormField,
    attribute: &str,
    value: &Value,
    measure: Measure,
) {
    for rule in &field.validation_rules {
        if let Some(message) = rule.violation(attribute, value, measure) {
            errors.add(&field.name, message);
        }
    }
}
