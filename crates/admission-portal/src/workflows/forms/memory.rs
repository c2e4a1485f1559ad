use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::domain::{
    AdmissionForm, FieldType, FormField, FormSection, FormSubmission, NewSubmission,
    SubmissionStatus,
};
use super::rules::FieldRule;
use super::FormRepository;
use crate::workflows::admission::repository::RepositoryError;

pub const SEEDED_SHORT_CODE: &str = "bsc-nursing-2026";

#[derive(Debug, Default)]
struct FormTable {
    forms: Vec<AdmissionForm>,
    submissions: Vec<FormSubmission>,
}

/// Forms and submissions held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForms {
    table: Arc<Mutex<FormTable>>,
}

impl InMemoryForms {
    /// Publishes the B.Sc. Nursing form for the 2026 intake.
    pub fn seeded() -> Self {
        Self::default().with_form(bsc_nursing_form())
    }

    pub fn with_form(self, form: AdmissionForm) -> Self {
        {
            let mut table = self.table.lock().expect("form mutex poisoned");
            table.forms.retain(|existing| existing.short_code != form.short_code);
            table.forms.push(form);
        }
        self
    }

    pub fn submissions(&self) -> Vec<FormSubmission> {
        self.table
            .lock()
            .expect("form mutex poisoned")
            .submissions
            .clone()
    }
}

impl FormRepository for InMemoryForms {
    fn active_form(&self, short_code: &str) -> Result<Option<AdmissionForm>, RepositoryError> {
        let table = self.table.lock().expect("form mutex poisoned");
        Ok(table
            .forms
            .iter()
            .find(|form| form.is_active && form.short_code == short_code)
            .cloned())
    }

    fn save_submission(&self, submission: NewSubmission) -> Result<FormSubmission, RepositoryError> {
        let mut table = self.table.lock().expect("form mutex poisoned");
        let stored = FormSubmission {
            id: table.submissions.len() as u64 + 1,
            admission_form_id: submission.admission_form_id,
            data: submission.data,
            status: SubmissionStatus::Pending,
            submitted_at: submission.submitted_at,
        };
        table.submissions.push(stored.clone());
        Ok(stored)
    }
}

fn bsc_nursing_form() -> AdmissionForm {
    let sections = [
        (
            1,
            "Personal Details",
            "Enter your personal information as per official documents.",
            vec![
                ("Full Name", "full_name", FieldType::Text, None, 6, vec![FieldRule::Max(255.0)]),
                ("Date of Birth", "dob", FieldType::Date, None, 6, vec![]),
                (
                    "Gender",
                    "gender",
                    FieldType::Radio,
                    Some(&["Male", "Female", "Other"][..]),
                    6,
                    vec![],
                ),
                (
                    "Category",
                    "category",
                    FieldType::Select,
                    Some(&["General", "OBC", "SC", "ST"][..]),
                    6,
                    vec![],
                ),
            ],
        ),
        (
            2,
            "Contact Details",
            "Please provide valid contact information.",
            vec![
                ("Email Address", "email", FieldType::Email, None, 6, vec![]),
                (
                    "Phone Number",
                    "phone",
                    FieldType::Number,
                    None,
                    6,
                    vec![FieldRule::Integer],
                ),
                ("Permanent Address", "address", FieldType::Textarea, None, 12, vec![]),
            ],
        ),
        (
            3,
            "Academic & Documents",
            "Upload necessary documents.",
            vec![
                (
                    "High School Percentage",
                    "hs_percentage",
                    FieldType::Number,
                    None,
                    6,
                    vec![FieldRule::Min(0.0), FieldRule::Max(100.0)],
                ),
                (
                    "Intermediate Percentage",
                    "inter_percentage",
                    FieldType::Number,
                    None,
                    6,
                    vec![FieldRule::Min(0.0), FieldRule::Max(100.0)],
                ),
                ("Upload Photo", "photo", FieldType::File, None, 6, vec![FieldRule::Max(2048.0)]),
                (
                    "Upload Signature",
                    "signature",
                    FieldType::File,
                    None,
                    6,
                    vec![FieldRule::Max(2048.0)],
                ),
                (
                    "I agree to the terms and conditions",
                    "terms",
                    FieldType::Checkbox,
                    None,
                    12,
                    vec![],
                ),
            ],
        ),
    ];

    let mut next_field_id = 0;
    let sections = sections
        .into_iter()
        .map(|(section_id, title, description, fields)| FormSection {
            id: section_id,
            title: title.to_string(),
            description: Some(description.to_string()),
            order: section_id as u32,
            fields: fields
                .into_iter()
                .zip(1u32..)
                .map(|((label, name, field_type, options, grid_width, rules), order)| {
                    next_field_id += 1;
                    FormField {
                        id: next_field_id,
                        section_id,
                        field_type,
                        label: label.to_string(),
                        name: name.to_string(),
                        placeholder: None,
                        options: options
                            .map(|items: &[&str]| items.iter().map(|item| item.to_string()).collect()),
                        is_required: true,
                        grid_width,
                        order,
                        validation_rules: rules,
                    }
                })
                .collect(),
        })
        .collect();

    AdmissionForm {
        id: 1,
        institute_id: Some(1),
        branch_id: Some(1),
        academic_session_id: Some(1),
        uuid: Uuid::new_v4().to_string(),
        title: "B.Sc. Nursing Admission 2026".to_string(),
        description: Some(
            "Application form for Bachelor of Science in Nursing. Please fill all details carefully."
                .to_string(),
        ),
        short_code: SEEDED_SHORT_CODE.to_string(),
        opens_at: None,
        closes_at: None,
        is_active: true,
        sections,
    }
}
