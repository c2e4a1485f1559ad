pub mod credentials;
pub(crate) mod otp;
mod service;
pub mod session;

pub use credentials::PasswordHash;
pub use service::{
    AccountError, AccountService, ApplicantSummary, LoginOutcome, OtpDispatched,
    RegistrationRequest, SessionGrant,
};
pub use session::SessionRegistry;
