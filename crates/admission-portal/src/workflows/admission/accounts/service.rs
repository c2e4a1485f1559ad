use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::credentials::PasswordHash;
use super::otp::{self, OtpRejection};
use super::session::SessionRegistry;
use crate::workflows::admission::domain::{
    ApplicantId, ApplicantRecord, ApplicantStatus, NewApplicant, WizardProgress,
};
use crate::workflows::admission::portal::PortalContext;
use crate::workflows::admission::repository::{Notification, NotificationTemplate, RepositoryError};
use crate::workflows::admission::status::{self, ApplicantAction};
use crate::workflows::admission::validation::{self, ValidationErrors};

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_confirmation: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub mobile_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpDispatched {
    pub email: String,
    pub otp_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated {
        token: String,
        applicant: ApplicantSummary,
    },
    RequiresOtp {
        email: String,
        otp_expires_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub token: String,
    pub applicant: ApplicantSummary,
}

/// Dashboard view of the signed-in applicant.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantSummary {
    pub id: ApplicantId,
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub status: ApplicantStatus,
    pub progress: WizardProgress,
    pub available_actions: Vec<ApplicantAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ApplicantSummary {
    pub fn from_record(record: &ApplicantRecord) -> Self {
        let account = &record.account;
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            mobile: account.mobile.clone(),
            status: account.status,
            progress: record.form.progress(),
            available_actions: status::available_actions(account.status),
            rejection_reason: account.rejection_reason.clone(),
            submitted_at: account.submitted_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("Authentication required.")]
    Unauthenticated,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for AccountError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Registration, OTP verification, login and recovery.
pub struct AccountService {
    context: Arc<PortalContext>,
    sessions: SessionRegistry,
}

impl AccountService {
    pub fn new(context: Arc<PortalContext>, sessions: SessionRegistry) -> Self {
        Self { context, sessions }
    }

    pub fn register(&self, request: RegistrationRequest) -> Result<OtpDispatched, AccountError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_ascii_lowercase();
        let mobile = request.mobile.trim().to_string();
        let mut errors = ValidationErrors::new();

        if validation::required(&mut errors, "username", &username) {
            let length = username.chars().count();
            if !(3..=50).contains(&length) {
                errors.add("username", "The username must be between 3 and 50 characters.");
            } else if self.context.applicants.find_by_username(&username)?.is_some() {
                errors.add("username", "The username has already been taken.");
            }
        }

        if validation::required(&mut errors, "email", &email) {
            if !validation::is_valid_email(&email) {
                errors.add("email", "The email must be a valid email address.");
            }
            validation::max_len(&mut errors, "email", &email, 255);
            if request.email_confirmation.trim().to_ascii_lowercase() != email {
                errors.add("email", "The email confirmation does not match.");
            }
            if !errors.has("email") && self.context.applicants.find_by_email(&email)?.is_some() {
                errors.add("email", "The email has already been taken.");
            }
        }

        validate_password(&mut errors, &request.password, &request.password_confirmation);

        if validation::required(&mut errors, "mobile", &mobile) {
            if !is_ten_digit_mobile(&mobile) {
                errors.add("mobile", "The mobile must be 10 digits.");
            }
            if request.mobile_confirmation.trim() != mobile {
                errors.add("mobile", "The mobile confirmation does not match.");
            }
            if !errors.has("mobile") && self.context.applicants.find_by_mobile(&mobile)?.is_some()
            {
                errors.add("mobile", "The mobile has already been taken.");
            }
        }

        errors.into_result()?;

        let now = self.context.now();
        let challenge = otp::issue(now, self.context.config.otp_ttl_minutes);
        let record = self.context.applicants.insert(NewApplicant {
            username,
            email,
            mobile,
            password: PasswordHash::new(&request.password),
            otp: challenge.clone(),
            created_at: now,
        })?;

        info!(applicant_id = %record.id(), "applicant registered; awaiting OTP");
        self.send_otp(&record, NotificationTemplate::ApplicantOtp);

        Ok(OtpDispatched {
            email: record.account.email,
            otp_expires_at: challenge.expires_at,
        })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let invalid = || {
            AccountError::Validation(ValidationErrors::single(
                "username",
                "Invalid username or password.",
            ))
        };

        let mut record = self
            .context
            .applicants
            .find_by_username(username.trim())?
            .ok_or_else(invalid)?;
        if !record.account.password.verify(password) {
            return Err(invalid());
        }

        if !record.account.is_verified() {
            let challenge = otp::issue(self.context.now(), self.context.config.otp_ttl_minutes);
            record.account.otp = Some(challenge.clone());
            self.context.applicants.update(record.clone())?;
            self.send_otp(&record, NotificationTemplate::ApplicantOtp);
            return Ok(LoginOutcome::RequiresOtp {
                email: record.account.email,
                otp_expires_at: challenge.expires_at,
            });
        }

        let token = self.sessions.issue(record.id(), self.context.now());
        info!(applicant_id = %record.id(), "applicant signed in");
        Ok(LoginOutcome::Authenticated {
            token,
            applicant: ApplicantSummary::from_record(&record),
        })
    }

    pub fn verify_otp(&self, email: &str, code: &str) -> Result<SessionGrant, AccountError> {
        let mut record = self
            .context
            .applicants
            .find_by_email(email.trim())?
            .ok_or_else(|| {
                ValidationErrors::single("email", "No account was found for this email address.")
            })?;

        check_otp(&record, code, self.context.now())?;

        record.account.email_verified_at = Some(self.context.now());
        record.account.otp = None;
        self.context.applicants.update(record.clone())?;

        info!(applicant_id = %record.id(), "applicant email verified");
        self.send_registered(&record);

        let token = self.sessions.issue(record.id(), self.context.now());
        Ok(SessionGrant {
            token,
            applicant: ApplicantSummary::from_record(&record),
        })
    }

    pub fn request_password_reset(&self, username: &str) -> Result<OtpDispatched, AccountError> {
        let mut record = self
            .context
            .applicants
            .find_by_username(username.trim())?
            .filter(|record| record.account.is_verified())
            .ok_or_else(|| {
                ValidationErrors::single(
                    "username",
                    "No verified account was found for this username.",
                )
            })?;

        let challenge = otp::issue(self.context.now(), self.context.config.otp_ttl_minutes);
        record.account.otp = Some(challenge.clone());
        self.context.applicants.update(record.clone())?;
        self.send_otp(&record, NotificationTemplate::ApplicantPasswordResetOtp);

        Ok(OtpDispatched {
            email: record.account.email,
            otp_expires_at: challenge.expires_at,
        })
    }

    pub fn reset_password(
        &self,
        username: &str,
        code: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<(), AccountError> {
        let mut errors = ValidationErrors::new();
        validate_password(&mut errors, password, password_confirmation);
        errors.into_result()?;

        let mut record = self
            .context
            .applicants
            .find_by_username(username.trim())?
            .filter(|record| record.account.is_verified())
            .ok_or_else(|| {
                ValidationErrors::single(
                    "username",
                    "No verified account was found for this username.",
                )
            })?;

        check_otp(&record, code, self.context.now())?;

        record.account.password = PasswordHash::new(password);
        record.account.otp = None;
        self.context.applicants.update(record.clone())?;
        info!(applicant_id = %record.id(), "applicant password reset");
        Ok(())
    }

    pub fn request_username_reminder(&self, email: &str) -> Result<(), AccountError> {
        let record = self.verified_by_email(email)?;
        self.context.notify(
            Notification::new(
                NotificationTemplate::ApplicantUsernameReminder,
                record.id(),
                &record.account.email,
            )
            .detail("username", record.account.username.as_str()),
        );
        Ok(())
    }

    pub fn resend_registration_email(&self, email: &str) -> Result<(), AccountError> {
        let record = self.verified_by_email(email)?;
        self.send_registered(&record);
        Ok(())
    }

    /// Resolves a bearer token to its applicant.
    pub fn authenticate(&self, token: &str) -> Result<ApplicantId, AccountError> {
        self.sessions
            .resolve(token, self.context.now())
            .ok_or(AccountError::Unauthenticated)
    }

    pub fn me(&self, applicant_id: ApplicantId) -> Result<ApplicantSummary, AccountError> {
        let record = self
            .context
            .applicants
            .fetch(applicant_id)?
            .ok_or(AccountError::Unauthenticated)?;
        Ok(ApplicantSummary::from_record(&record))
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    fn verified_by_email(&self, email: &str) -> Result<ApplicantRecord, AccountError> {
        let record = self
            .context
            .applicants
            .find_by_email(email.trim())?
            .filter(|record| record.account.is_verified())
            .ok_or_else(|| {
                ValidationErrors::single(
                    "email",
                    "No verified account was found for this email address.",
                )
            })?;
        Ok(record)
    }

    fn send_otp(&self, record: &ApplicantRecord, template: NotificationTemplate) {
        let Some(challenge) = record.account.otp.as_ref() else {
            return;
        };
        self.context.notify(
            Notification::new(template, record.id(), &record.account.email)
                .detail("username", record.account.username.as_str())
                .detail("otp", challenge.code.as_str())
                .detail("expires_at", challenge.expires_at.to_rfc3339()),
        );
    }

    fn send_registered(&self, record: &ApplicantRecord) {
        let login_url = format!("{}/applicant/login", self.context.config.public_base_url);
        self.context.notify(
            Notification::new(
                NotificationTemplate::ApplicantRegistered,
                record.id(),
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("login_url", login_url),
        );
    }
}

fn validate_password(errors: &mut ValidationErrors, password: &str, confirmation: &str) {
    if validation::required(errors, "password", password) {
        if password.chars().count() < 6 {
            errors.add("password", "The password must be at least 6 characters.");
        }
        if password != confirmation {
            errors.add("password", "The password confirmation does not match.");
        }
    }
}

fn check_otp(
    record: &ApplicantRecord,
    code: &str,
    now: DateTime<Utc>,
) -> Result<(), ValidationErrors> {
    otp::check(record.account.otp.as_ref(), code, now).map_err(|rejection| match rejection {
        OtpRejection::Expired => ValidationErrors::single(
            "otp",
            "The OTP has expired. Please request a new one.",
        ),
        OtpRejection::Incorrect => {
            ValidationErrors::single("otp", "The OTP entered is incorrect.")
        }
    })
}

fn is_ten_digit_mobile(value: &str) -> bool {
    value.len() == 10 && value.chars().all(|c| c.is_ascii_digit())
}
