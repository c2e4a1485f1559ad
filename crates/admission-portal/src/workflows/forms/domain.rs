use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rules::FieldRule;

/// A published admission form, addressed publicly by its short code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionForm {
    pub id: u64,
    pub institute_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub academic_session_id: Option<u64>,
    pub uuid: String,
    pub title: String,
    pub description: Option<String>,
    pub short_code: String,
    pub opens_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub sections: Vec<FormSection>,
}

impl AdmissionForm {
    /// Sections and their fields sorted by `order`.
    pub fn ordered(mut self) -> Self {
        self.sections.sort_by_key(|section| section.order);
        for section in &mut self.sections {
            section.fields.sort_by_key(|field| field.order);
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.opens_at.map_or(true, |opens| now >= opens)
            && self.closes_at.map_or(true, |closes| now <= closes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub order: u32,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: u64,
    pub section_id: u64,
    pub field_type: FieldType,
    pub label: String,
    pub name: String,
    pub placeholder: Option<String>,
    pub options: Option<Vec<String>>,
    pub is_required: bool,
    /// Columns out of twelve the field spans on the rendered form.
    pub grid_width: u8,
    pub order: u32,
    #[serde(default)]
    pub validation_rules: Vec<FieldRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Number,
    Date,
    Select,
    Radio,
    Checkbox,
    File,
}

/// File reference posted for a `file` field; the bytes were uploaded beforehand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileValue {
    #[serde(default)]
    pub storage_key: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub admission_form_id: u64,
    pub data: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: u64,
    pub admission_form_id: u64,
    pub data: Map<String, Value>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Body returned after a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    pub message: &'static str,
    pub submission_id: u64,
}
