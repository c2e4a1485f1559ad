//! Applicant accounts, the application wizard, review and fee payment.

pub mod accounts;
pub mod domain;
pub mod payments;
pub mod portal;
pub mod repository;
pub mod review;
pub mod router;
pub mod snapshot;
pub mod status;
pub mod uploads;
pub(crate) mod validation;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use accounts::{
    AccountError, AccountService, ApplicantSummary, LoginOutcome, OtpDispatched, PasswordHash,
    RegistrationRequest, SessionGrant, SessionRegistry,
};
pub use domain::{
    ApplicantAccount, ApplicantId, ApplicantRecord, ApplicantStatus, ApplicationForm,
    CorrespondenceDetails, DocumentType, NewApplicant, OtpChallenge, PersonalDetails,
    ProgrammeDetails, QualificationDetails, QualificationEntry, UploadRecord, WizardProgress,
};
pub use payments::{
    CashfreeClient, FinalRegistration, LedgerEntry, LedgerStatus, PaymentError, PaymentGateway,
    PaymentService,
};
pub use portal::{AdmissionPortal, AdmissionPortalBuilder, PortalContext, PortalDependencies};
pub use repository::{
    ApplicantRepository, Clock, Mailer, MailerError, Notification, NotificationTemplate,
    RegistrationLedger, RepositoryError, SystemClock,
};
pub use review::{ReviewError, ReviewService};
pub use router::admission_router;
pub use snapshot::ApplicationSnapshot;
pub use status::{ApplicantAction, WorkflowError, WorkflowEvent};
pub use uploads::{
    AcceptAllVerifier, CommandImageVerifier, ImageVerifier, UploadError, UploadRequest,
    UploadService, VerificationVerdict,
};
pub use validation::ValidationErrors;
pub use wizard::{WizardError, WizardService};
