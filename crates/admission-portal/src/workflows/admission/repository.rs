use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{ApplicantId, ApplicantRecord, ApplicantStatus, NewApplicant};
use super::payments::domain::{
    AdmissionPayment, FinalRegistration, LedgerEntry, LedgerStatus,
};

/// Storage abstraction for applicant accounts and their wizard data.
pub trait ApplicantRepository: Send + Sync {
    /// Assigns the next id. Username, email and mobile must all be unused.
    fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, RepositoryError>;
    fn update(&self, record: ApplicantRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError>;
    fn find_by_username(&self, username: &str)
        -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Case-insensitive.
    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError>;
    fn find_by_mobile(&self, mobile: &str) -> Result<Option<ApplicantRecord>, RepositoryError>;
    /// Records in the given status, oldest submission first.
    fn by_status(
        &self,
        status: ApplicantStatus,
        limit: usize,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError>;
}

/// Final registrations and their admission payment rows.
pub trait RegistrationLedger: Send + Sync {
    /// Stores both rows together and assigns the registration id. A second
    /// write for the same transaction id is a conflict.
    fn record(
        &self,
        registration: FinalRegistration,
        payment: AdmissionPayment,
    ) -> Result<FinalRegistration, RepositoryError>;
    fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>, RepositoryError>;
    /// Newest first.
    fn for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<FinalRegistration>, RepositoryError>;
    /// Moves the payment row to `status` via [`LedgerEntry::settle`].
    fn settle(
        &self,
        transaction_id: &str,
        status: LedgerStatus,
    ) -> Result<LedgerEntry, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound mail hook; rendering templates is the adapter's job.
pub trait Mailer: Send + Sync {
    fn send(&self, notification: Notification) -> Result<(), MailerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    ApplicantOtp,
    ApplicantRegistered,
    ApplicantPasswordResetOtp,
    ApplicantUsernameReminder,
    StudentApplicationSubmitted,
    ApplicationApproved,
    ApplicationRejected,
    PaymentVerification,
    PaymentRejected,
    RegistrationSuccess,
}

impl NotificationTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationTemplate::ApplicantOtp => "applicant_otp",
            NotificationTemplate::ApplicantRegistered => "applicant_registered",
            NotificationTemplate::ApplicantPasswordResetOtp => "applicant_password_reset_otp",
            NotificationTemplate::ApplicantUsernameReminder => "applicant_username_reminder",
            NotificationTemplate::StudentApplicationSubmitted => "student_application_submitted",
            NotificationTemplate::ApplicationApproved => "application_approved",
            NotificationTemplate::ApplicationRejected => "application_rejected",
            NotificationTemplate::PaymentVerification => "payment_verification",
            NotificationTemplate::PaymentRejected => "payment_rejected",
            NotificationTemplate::RegistrationSuccess => "registration_success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: NotificationTemplate,
    pub applicant_id: ApplicantId,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(template: NotificationTemplate, applicant_id: ApplicantId, recipient: &str) -> Self {
        Self {
            template,
            applicant_id,
            recipient: recipient.to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Sends a notification; failures are logged and never bubble up.
pub(crate) fn dispatch(mailer: &dyn Mailer, notification: Notification) {
    let template = notification.template.label();
    let applicant_id = notification.applicant_id;
    if let Err(err) = mailer.send(notification) {
        warn!(template, %applicant_id, error = %err, "notification dispatch failed");
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
