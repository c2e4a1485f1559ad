use std::sync::Arc;

use tracing::info;

use super::domain::{ApplicantId, ApplicantRecord, ApplicantStatus};
use super::portal::PortalContext;
use super::repository::{Notification, NotificationTemplate, RepositoryError};
use super::snapshot::ApplicationSnapshot;
use super::status::{self, WorkflowError, WorkflowEvent};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("Application {0} was not found.")]
    NotFound(ApplicantId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Applicant submission and the administrator's decision.
pub struct ReviewService {
    context: Arc<PortalContext>,
}

impl ReviewService {
    pub fn new(context: Arc<PortalContext>) -> Self {
        Self { context }
    }

    pub fn submit(&self, applicant_id: ApplicantId) -> Result<ApplicationSnapshot, ReviewError> {
        let mut record = self.load(applicant_id)?;
        let next = status::transition(record.account.status, WorkflowEvent::Submit)?;
        status::ensure_complete(&record.form.progress())?;

        record.account.status = next;
        record.account.submitted_at = Some(self.context.now());
        record.account.rejection_reason = None;
        self.context.applicants.update(record.clone())?;

        info!(%applicant_id, "application submitted for review");
        self.context.notify(
            Notification::new(
                NotificationTemplate::StudentApplicationSubmitted,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str()),
        );

        Ok(ApplicationSnapshot::from(&record))
    }

    /// Submitted applications awaiting a decision, oldest first.
    pub fn pending(&self, limit: usize) -> Result<Vec<ApplicationSnapshot>, ReviewError> {
        let records = self
            .context
            .applicants
            .by_status(ApplicantStatus::Submitted, limit)?;
        Ok(records.iter().map(ApplicationSnapshot::from).collect())
    }

    pub fn application(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<ApplicationSnapshot, ReviewError> {
        let record = self.load(applicant_id)?;
        Ok(ApplicationSnapshot::from(&record))
    }

    pub fn approve(&self, applicant_id: ApplicantId) -> Result<ApplicationSnapshot, ReviewError> {
        let mut record = self.load(applicant_id)?;
        record.account.status = status::transition(record.account.status, WorkflowEvent::Approve)?;
        self.context.applicants.update(record.clone())?;

        info!(%applicant_id, "application approved");
        let fee_url = format!("{}/applicant/fee", self.context.config.public_base_url);
        self.context.notify(
            Notification::new(
                NotificationTemplate::ApplicationApproved,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("fee_url", fee_url),
        );

        Ok(ApplicationSnapshot::from(&record))
    }

    pub fn reject(
        &self,
        applicant_id: ApplicantId,
        reason: &str,
    ) -> Result<ApplicationSnapshot, ReviewError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::MissingReason.into());
        }

        let mut record = self.load(applicant_id)?;
        record.account.status = status::transition(record.account.status, WorkflowEvent::Reject)?;
        record.account.rejection_reason = Some(reason.to_string());
        self.context.applicants.update(record.clone())?;

        info!(%applicant_id, "application rejected");
        self.context.notify(
            Notification::new(
                NotificationTemplate::ApplicationRejected,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("reason", reason),
        );

        Ok(ApplicationSnapshot::from(&record))
    }

    fn load(&self, applicant_id: ApplicantId) -> Result<ApplicantRecord, ReviewError> {
        self.context
            .applicants
            .fetch(applicant_id)?
            .ok_or(ReviewError::NotFound(applicant_id))
    }
}
