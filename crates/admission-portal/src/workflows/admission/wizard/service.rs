use std::sync::Arc;

use tracing::debug;

use super::validation::{
    validate_correspondence, validate_personal, validate_programme, validate_qualification,
    QualificationRequest,
};
use crate::workflows::admission::domain::{
    ApplicantId, ApplicantRecord, CorrespondenceDetails, PersonalDetails, ProgrammeDetails,
    QualificationDetails, WizardProgress,
};
use crate::workflows::admission::portal::PortalContext;
use crate::workflows::admission::repository::RepositoryError;
use crate::workflows::admission::status::{self, WorkflowError};
use crate::workflows::admission::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The four data-entry pages of the application form.
pub struct WizardService {
    context: Arc<PortalContext>,
}

impl WizardService {
    pub fn new(context: Arc<PortalContext>) -> Self {
        Self { context }
    }

    /// Stored details, or blank ones pre-filled from the account.
    pub fn personal(&self, applicant_id: ApplicantId) -> Result<PersonalDetails, WizardError> {
        let record = self.context.load(applicant_id)?;
        let mut details = record.form.personal.clone().unwrap_or_default();
        if details.email.as_deref().map_or(true, str::is_empty) {
            details.email = Some(record.account.email.clone());
        }
        if details.mobile.as_deref().map_or(true, str::is_empty) {
            details.mobile = Some(record.account.mobile.clone());
        }
        Ok(details)
    }

    pub fn save_personal(
        &self,
        applicant_id: ApplicantId,
        details: PersonalDetails,
    ) -> Result<WizardProgress, WizardError> {
        self.edit(applicant_id, "personal", |record| {
            validate_personal(&details)?;
            record.form.personal = Some(details);
            Ok(())
        })
    }

    pub fn programme(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<ProgrammeDetails>, WizardError> {
        Ok(self.context.load(applicant_id)?.form.programme)
    }

    pub fn save_programme(
        &self,
        applicant_id: ApplicantId,
        details: ProgrammeDetails,
    ) -> Result<WizardProgress, WizardError> {
        self.edit(applicant_id, "programme", |record| {
            validate_programme(&details)?;
            record.form.programme = Some(details);
            Ok(())
        })
    }

    pub fn qualification(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<QualificationDetails, WizardError> {
        Ok(self
            .context
            .load(applicant_id)?
            .form
            .qualification
            .unwrap_or_default())
    }

    /// Replaces the whole qualification list.
    pub fn save_qualification(
        &self,
        applicant_id: ApplicantId,
        request: QualificationRequest,
    ) -> Result<WizardProgress, WizardError> {
        self.edit(applicant_id, "qualification", |record| {
            record.form.qualification = Some(validate_qualification(request)?);
            Ok(())
        })
    }

    pub fn correspondence(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<CorrespondenceDetails>, WizardError> {
        Ok(self.context.load(applicant_id)?.form.correspondence)
    }

    pub fn save_correspondence(
        &self,
        applicant_id: ApplicantId,
        details: CorrespondenceDetails,
    ) -> Result<WizardProgress, WizardError> {
        self.edit(applicant_id, "correspondence", |record| {
            validate_correspondence(&details)?;
            record.form.correspondence = Some(details);
            Ok(())
        })
    }

    pub fn progress(&self, applicant_id: ApplicantId) -> Result<WizardProgress, WizardError> {
        Ok(self.context.load(applicant_id)?.form.progress())
    }

    fn edit<F>(
        &self,
        applicant_id: ApplicantId,
        section: &'static str,
        apply: F,
    ) -> Result<WizardProgress, WizardError>
    where
        F: FnOnce(&mut ApplicantRecord) -> Result<(), WizardError>,
    {
        let mut record = self.context.load(applicant_id)?;
        status::ensure_editable(record.account.status)?;
        apply(&mut record)?;

        let progress = record.form.progress();
        self.context.applicants.update(record)?;
        debug!(%applicant_id, section, "wizard section saved");
        Ok(progress)
    }
}
