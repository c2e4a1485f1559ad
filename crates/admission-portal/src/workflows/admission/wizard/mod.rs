mod service;
pub mod validation;

pub use service::{WizardError, WizardService};
pub use validation::{QualificationInput, QualificationRequest};
