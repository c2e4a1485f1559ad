//! Admission forms defined as data: sections of typed fields that are
//! rendered by the client and validated here on submission.

pub mod domain;
mod memory;
mod rules;
mod service;

pub use domain::{
    AdmissionForm, FieldType, FileValue, FormField, FormSection, FormSubmission, NewSubmission,
    SubmissionReceipt, SubmissionStatus,
};
pub use memory::{InMemoryForms, SEEDED_SHORT_CODE};
pub use rules::{FieldRule, RuleError};
pub use service::{FormError, FormService, UPLOAD_DIRECTORY};

use crate::workflows::admission::repository::RepositoryError;

pub trait FormRepository: Send + Sync {
    /// The form with `short_code`, only while it is active.
    fn active_form(&self, short_code: &str) -> Result<Option<AdmissionForm>, RepositoryError>;
    /// Stores the submission as `pending` and assigns its id.
    fn save_submission(&self, submission: NewSubmission) -> Result<FormSubmission, RepositoryError>;
}
