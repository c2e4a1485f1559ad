use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicantId, ApplicantRecord, ApplicantStatus, CorrespondenceDetails, DocumentType,
    PersonalDetails, ProgrammeDetails, QualificationDetails, UploadRecord, WizardProgress,
};

/// Full application as shown to reviewers and frozen into final registrations.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSnapshot {
    pub id: ApplicantId,
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub status: ApplicantStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub progress: WizardProgress,
    pub personal_details: Option<PersonalDetails>,
    pub programme_details: Option<ProgrammeDetails>,
    pub qualification_details: Option<QualificationDetails>,
    pub correspondence_details: Option<CorrespondenceDetails>,
    pub uploads: BTreeMap<DocumentType, UploadRecord>,
}

impl From<&ApplicantRecord> for ApplicationSnapshot {
    fn from(record: &ApplicantRecord) -> Self {
        let account = &record.account;
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            mobile: account.mobile.clone(),
            status: account.status,
            submitted_at: account.submitted_at,
            rejection_reason: account.rejection_reason.clone(),
            created_at: account.created_at,
            progress: record.form.progress(),
            personal_details: record.form.personal.clone(),
            programme_details: record.form.programme.clone(),
            qualification_details: record.form.qualification.clone(),
            correspondence_details: record.form.correspondence.clone(),
            uploads: record.form.uploads.clone(),
        }
    }
}

impl ApplicationSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
