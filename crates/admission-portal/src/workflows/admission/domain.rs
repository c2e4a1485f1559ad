use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::accounts::credentials::PasswordHash;

/// Identifier wrapper for applicant accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// High level status tracked throughout the admission workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicantStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "submitted")]
    Submitted,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "Registered")]
    Registered,
}

impl ApplicantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicantStatus::Draft => "draft",
            ApplicantStatus::Submitted => "submitted",
            ApplicantStatus::Approved => "approved",
            ApplicantStatus::Rejected => "rejected",
            ApplicantStatus::Registered => "Registered",
        }
    }
}

impl fmt::Display for ApplicantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One-time code mailed to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Login identity and workflow state of a prospective student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantAccount {
    pub id: ApplicantId,
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub password: PasswordHash,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub otp: Option<OtpChallenge>,
    pub status: ApplicantStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApplicantAccount {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Account fields supplied at registration, before an id is assigned.
#[derive(Debug, Clone)]
pub struct NewApplicant {
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub password: PasswordHash,
    pub otp: OtpChallenge,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    #[serde(default)]
    pub apar_id: Option<String>,
    #[serde(default)]
    pub apar_name: Option<String>,
    #[serde(default)]
    pub apar_gender: Option<String>,
    #[serde(default)]
    pub apar_dob: Option<NaiveDate>,
    #[serde(default)]
    pub certificate_name: Option<String>,
    #[serde(default)]
    pub certificate_gender: Option<String>,
    #[serde(default)]
    pub certificate_dob: Option<NaiveDate>,
    #[serde(default)]
    pub mother_name: String,
    #[serde(default)]
    pub guardian_relation: String,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub citizenship_country: Option<String>,
    #[serde(default)]
    pub territory_area: String,
    #[serde(default)]
    pub minority: String,
    #[serde(default)]
    pub religion: String,
    #[serde(default)]
    pub marital_status: String,
    #[serde(default)]
    pub social_status: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alternate_email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub alternate_mobile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammeDetails {
    #[serde(default)]
    pub programme_type: String,
    #[serde(default)]
    pub mode_of_study: String,
    #[serde(default)]
    pub programme_enrollment: String,
    /// Branch identifier the applicant is applying to.
    #[serde(default)]
    pub region_code: String,
    #[serde(default)]
    pub study_center_code: String,
    #[serde(default)]
    pub medium: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationEntry {
    #[serde(default)]
    pub relevant_qualification: String,
    #[serde(default)]
    pub main_subjects: Option<String>,
    pub year_of_passing: i32,
    #[serde(default)]
    pub division: String,
    pub percent_marks: f32,
    #[serde(default)]
    pub board_code: String,
    #[serde(default)]
    pub board_roll_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualificationDetails {
    #[serde(default)]
    pub qualifications: Vec<QualificationEntry>,
    #[serde(default)]
    pub nad_username: Option<String>,
    #[serde(default)]
    pub nad_certificate_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceDetails {
    #[serde(default)]
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub post_office: String,
}

/// Free-form upload slot; `photo` and `signature` are mandatory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentType(pub String);

impl DocumentType {
    pub const PHOTO: &'static str = "photo";
    pub const SIGNATURE: &'static str = "signature";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Photo and signature go through the external image check.
    pub fn requires_image_verification(&self) -> bool {
        matches!(self.0.as_str(), Self::PHOTO | Self::SIGNATURE)
    }

    pub fn required() -> [DocumentType; 2] {
        [
            DocumentType(Self::PHOTO.to_string()),
            DocumentType(Self::SIGNATURE.to_string()),
        ]
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata for an uploaded document; bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub document_type: DocumentType,
    pub storage_key: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Completion flags for each wizard step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardProgress {
    pub personal: bool,
    pub programme: bool,
    pub qualification: bool,
    pub correspondence: bool,
    pub uploads: bool,
}

impl WizardProgress {
    pub fn missing_steps(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.personal {
            missing.push("personal");
        }
        if !self.programme {
            missing.push("programme");
        }
        if !self.qualification {
            missing.push("qualification");
        }
        if !self.correspondence {
            missing.push("correspondence");
        }
        if !self.uploads {
            missing.push("uploads");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_steps().is_empty()
    }
}

/// Everything the applicant entered through the wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationForm {
    pub personal: Option<PersonalDetails>,
    pub programme: Option<ProgrammeDetails>,
    pub qualification: Option<QualificationDetails>,
    pub correspondence: Option<CorrespondenceDetails>,
    pub uploads: BTreeMap<DocumentType, UploadRecord>,
}

impl ApplicationForm {
    pub fn progress(&self) -> WizardProgress {
        WizardProgress {
            personal: self.personal.is_some(),
            programme: self.programme.is_some(),
            qualification: self
                .qualification
                .as_ref()
                .map(|details| !details.qualifications.is_empty())
                .unwrap_or(false),
            correspondence: self.correspondence.is_some(),
            uploads: DocumentType::required()
                .iter()
                .all(|required| self.uploads.contains_key(required)),
        }
    }
}

/// Repository record pairing the account with its application form.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantRecord {
    pub account: ApplicantAccount,
    pub form: ApplicationForm,
}

impl ApplicantRecord {
    pub fn id(&self) -> ApplicantId {
        self.account.id
    }
}
