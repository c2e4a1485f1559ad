//! Every status guard of the admission workflow lives here.

use serde::Serialize;

use super::domain::{ApplicantStatus, WizardProgress};

/// Status-changing events accepted by [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    Submit,
    Approve,
    Reject,
    Register,
    /// A bank transfer was rejected at reconciliation; the fee is owed again.
    PaymentFailed,
}

impl WorkflowEvent {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowEvent::Submit => "submit",
            WorkflowEvent::Approve => "approve",
            WorkflowEvent::Reject => "reject",
            WorkflowEvent::Register => "register",
            WorkflowEvent::PaymentFailed => "fail payment for",
        }
    }
}

/// Dashboard actions offered to an applicant in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantAction {
    EditForms,
    Submit,
    Pay,
    ViewTransactions,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("The application is {status} and can no longer be edited.")]
    Locked { status: ApplicantStatus },
    #[error("Cannot {} an application that is {from}.", .event.label())]
    InvalidTransition {
        from: ApplicantStatus,
        event: WorkflowEvent,
    },
    #[error("Please complete all sections before submitting: {}.", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
    #[error("A rejection reason is required.")]
    MissingReason,
    #[error("Fee payment is available only after the application is approved.")]
    PaymentNotAllowed { status: ApplicantStatus },
}

pub fn can_edit(status: ApplicantStatus) -> bool {
    matches!(status, ApplicantStatus::Draft | ApplicantStatus::Rejected)
}

/// Guard applied to every wizard and upload write.
pub fn ensure_editable(status: ApplicantStatus) -> Result<(), WorkflowError> {
    if can_edit(status) {
        Ok(())
    } else {
        Err(WorkflowError::Locked { status })
    }
}

pub fn ensure_payable(status: ApplicantStatus) -> Result<(), WorkflowError> {
    if status == ApplicantStatus::Approved {
        Ok(())
    } else {
        Err(WorkflowError::PaymentNotAllowed { status })
    }
}

pub fn ensure_complete(progress: &WizardProgress) -> Result<(), WorkflowError> {
    let missing = progress.missing_steps();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Incomplete { missing })
    }
}

pub fn available_actions(status: ApplicantStatus) -> Vec<ApplicantAction> {
    match status {
        ApplicantStatus::Draft | ApplicantStatus::Rejected => {
            vec![ApplicantAction::EditForms, ApplicantAction::Submit]
        }
        ApplicantStatus::Submitted => Vec::new(),
        ApplicantStatus::Approved => vec![ApplicantAction::Pay],
        ApplicantStatus::Registered => vec![ApplicantAction::ViewTransactions],
    }
}

pub fn transition(
    from: ApplicantStatus,
    event: WorkflowEvent,
) -> Result<ApplicantStatus, WorkflowError> {
    use ApplicantStatus::*;

    match (from, event) {
        (Draft | Rejected, WorkflowEvent::Submit) => Ok(Submitted),
        (Submitted, WorkflowEvent::Approve) => Ok(Approved),
        (Submitted, WorkflowEvent::Reject) => Ok(Rejected),
        (Approved, WorkflowEvent::Register) => Ok(Registered),
        (Registered, WorkflowEvent::PaymentFailed) => Ok(Approved),
        _ => Err(WorkflowError::InvalidTransition { from, event }),
    }
}
