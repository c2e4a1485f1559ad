use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::accounts::{AccountService, SessionRegistry};
use super::domain::{ApplicantId, ApplicantRecord};
use super::payments::{PaymentGateway, PaymentService};
use super::repository::{
    self, ApplicantRepository, Clock, Mailer, Notification, RegistrationLedger, RepositoryError,
};
use super::review::ReviewService;
use super::uploads::{ImageVerifier, UploadService};
use super::wizard::WizardService;
use crate::config::{BankTransferDetails, PortalConfig};
use crate::workflows::catalog::Catalog;
use crate::workflows::forms::{FormRepository, FormService, InMemoryForms};

/// Storage and delivery adapters the portal runs on.
#[derive(Clone)]
pub struct PortalDependencies {
    pub applicants: Arc<dyn ApplicantRepository>,
    pub ledger: Arc<dyn RegistrationLedger>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
    pub catalog: Arc<dyn Catalog>,
}

/// Shared by every service of the portal.
pub struct PortalContext {
    pub(crate) applicants: Arc<dyn ApplicantRepository>,
    pub(crate) ledger: Arc<dyn RegistrationLedger>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) config: PortalConfig,
}

impl PortalContext {
    pub fn new(dependencies: PortalDependencies, config: PortalConfig) -> Self {
        Self {
            applicants: dependencies.applicants,
            ledger: dependencies.ledger,
            mailer: dependencies.mailer,
            clock: dependencies.clock,
            catalog: dependencies.catalog,
            config,
        }
    }

    pub(crate) fn load(&self, applicant_id: ApplicantId) -> Result<ApplicantRecord, RepositoryError> {
        self.applicants
            .fetch(applicant_id)?
            .ok_or(RepositoryError::NotFound)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn notify(&self, notification: Notification) {
        repository::dispatch(self.mailer.as_ref(), notification);
    }
}

/// Everything the HTTP layer needs, wired once at startup.
pub struct AdmissionPortal {
    pub accounts: AccountService,
    pub wizard: WizardService,
    pub uploads: UploadService,
    pub review: ReviewService,
    pub payments: PaymentService,
    pub forms: FormService,
    pub catalog: Arc<dyn Catalog>,
    admin_token: Option<String>,
}

impl AdmissionPortal {
    pub fn builder(dependencies: PortalDependencies, config: PortalConfig) -> AdmissionPortalBuilder {
        AdmissionPortalBuilder {
            dependencies,
            config,
            verifier: None,
            gateway: None,
            bank_transfer: None,
            forms: None,
        }
    }

    /// `None` when no administrator token is configured.
    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }
}

pub struct AdmissionPortalBuilder {
    dependencies: PortalDependencies,
    config: PortalConfig,
    verifier: Option<Arc<dyn ImageVerifier>>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    bank_transfer: Option<BankTransferDetails>,
    forms: Option<Arc<dyn FormRepository>>,
}

impl AdmissionPortalBuilder {
    pub fn verifier(mut self, verifier: Arc<dyn ImageVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn bank_transfer(mut self, details: Option<BankTransferDetails>) -> Self {
        self.bank_transfer = details;
        self
    }

    /// Defaults to the seeded in-memory forms.
    pub fn forms(mut self, forms: Arc<dyn FormRepository>) -> Self {
        self.forms = Some(forms);
        self
    }

    pub fn build(self) -> AdmissionPortal {
        let catalog = self.dependencies.catalog.clone();
        let forms = FormService::new(
            self.forms
                .unwrap_or_else(|| Arc::new(InMemoryForms::seeded())),
            self.dependencies.clock.clone(),
        );
        let admin_token = self.config.admin_token.clone();
        let sessions = SessionRegistry::new(Duration::minutes(self.config.session_ttl_minutes));
        let context = Arc::new(PortalContext::new(self.dependencies, self.config));
        let verifier = self
            .verifier
            .unwrap_or_else(|| Arc::new(super::uploads::AcceptAllVerifier));

        AdmissionPortal {
            accounts: AccountService::new(context.clone(), sessions),
            wizard: WizardService::new(context.clone()),
            uploads: UploadService::new(context.clone(), verifier),
            review: ReviewService::new(context.clone()),
            payments: PaymentService::new(context, self.gateway, self.bank_transfer),
            forms,
            catalog,
            admin_token,
        }
    }
}
