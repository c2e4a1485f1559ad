use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    AdmissionPayment, BankTransferRequest, FinalRegistration, GatewayDescriptor,
    GatewayOrderView, LedgerEntry, LedgerStatus, PaymentMethod, PaymentMode, ProofDocument,
    RegistrationPaymentStatus, VerificationOutcome, PAYMENT_GROUP,
};
use super::gateway::{
    CustomerDetails, GatewayError, GatewayOrderRequest, OrderMeta, PaymentGateway,
};
use crate::config::BankTransferDetails;
use crate::workflows::admission::domain::{ApplicantId, ApplicantRecord};
use crate::workflows::admission::portal::PortalContext;
use crate::workflows::admission::repository::{
    Notification, NotificationTemplate, RepositoryError,
};
use crate::workflows::admission::snapshot::ApplicationSnapshot;
use crate::workflows::admission::status::{self, WorkflowError, WorkflowEvent};
use crate::workflows::admission::validation::{self, ValidationErrors};
use crate::workflows::catalog::FeeSchedule;
use crate::workflows::money::Amount;

const MAX_PROOF_BYTES: u64 = 2 * 1024 * 1024;
const PROOF_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "pdf"];
const FALLBACK_PHONE: &str = "9999999999";

/// Payment channels offered on the fee page.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOptions {
    pub gateways: Vec<GatewayDescriptor>,
    pub bank_transfer: Option<BankTransferDetails>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("Online payment is not configured.")]
    NotConfigured,
    #[error("An order id is required.")]
    MissingOrderId,
    #[error("This order does not belong to your application.")]
    OrderNotOwned,
    #[error("This payment was already marked {}.", .0.label())]
    AlreadySettled(LedgerStatus),
}

/// Where an applicant's fee is booked, derived from the programme page.
struct Placement {
    institute_id: Option<u64>,
    branch_id: Option<u64>,
    fee: Option<FeeSchedule>,
}

pub struct PaymentService {
    context: Arc<PortalContext>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    bank_transfer: Option<BankTransferDetails>,
}

impl PaymentService {
    pub fn new(
        context: Arc<PortalContext>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        bank_transfer: Option<BankTransferDetails>,
    ) -> Self {
        Self {
            context,
            gateway,
            bank_transfer,
        }
    }

    pub fn active_gateways(&self) -> PaymentOptions {
        let gateways = self
            .gateway
            .as_ref()
            .map(|_| GatewayDescriptor {
                id: "cashfree",
                name: "Cashfree Payments",
            })
            .into_iter()
            .collect();
        PaymentOptions {
            gateways,
            bank_transfer: self.bank_transfer.clone(),
        }
    }

    /// Fee heads for the applicant's branch and programme, when one is published.
    pub fn fee_schedule_for(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<FeeSchedule>, PaymentError> {
        let record = self.context.load(applicant_id)?;
        Ok(self.placement(&record).fee)
    }

    pub fn submit_bank_transfer(
        &self,
        applicant_id: ApplicantId,
        request: BankTransferRequest,
    ) -> Result<FinalRegistration, PaymentError> {
        let record = self.context.load(applicant_id)?;
        status::ensure_payable(record.account.status)?;
        let placement = self.placement(&record);

        let transaction_id = request.transaction_id.trim().to_string();
        let bank_name = request.bank_name.trim().to_string();
        let mut errors = ValidationErrors::new();
        check_amount(&mut errors, request.amount, placement.fee.as_ref());
        validation::required_max(&mut errors, "transaction_id", &transaction_id, 100);
        validation::required_max(&mut errors, "bank_name", &bank_name, 255);
        check_proof(&mut errors, &request.proof_document);
        errors.into_result()?;

        let proof = request.proof_document.storage_key;
        let registration = FinalRegistration {
            id: 0,
            applicant_id,
            institute_id: placement.institute_id,
            branch_id: placement.branch_id,
            payment_method: PaymentMethod::BankTransfer,
            payment_status: RegistrationPaymentStatus::Pending,
            amount: request.amount,
            transaction_id: transaction_id.clone(),
            bank_name: Some(bank_name.clone()),
            transaction_date: request.transaction_date,
            proof_document: Some(proof.clone()),
            application_snapshot: ApplicationSnapshot::from(&record).to_json(),
            created_at: self.context.now(),
        };
        let payment = AdmissionPayment {
            institute_id: placement.institute_id,
            branch_id: placement.branch_id,
            applicant_id,
            payment_group: PAYMENT_GROUP.to_string(),
            amount: request.amount,
            transaction_date: request.transaction_date,
            transaction_id: transaction_id.clone(),
            bank_name: Some(bank_name),
            bank_branch_name: None,
            payment_mode: PaymentMode::BankTransfer,
            payment_proof: Some(proof),
            status: LedgerStatus::Pending,
        };

        let registration = self.context.ledger.record(registration, payment)?;
        info!(%applicant_id, %transaction_id, amount = %registration.amount, "bank transfer recorded");

        let record = self.register(record)?;
        self.context.notify(
            Notification::new(
                NotificationTemplate::PaymentVerification,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("transaction_id", transaction_id)
            .detail("amount", registration.amount.to_string()),
        );

        Ok(registration)
    }

    pub async fn create_gateway_order(
        &self,
        applicant_id: ApplicantId,
        amount: Amount,
    ) -> Result<GatewayOrderView, PaymentError> {
        let gateway = self.gateway.as_ref().ok_or(PaymentError::NotConfigured)?;
        let record = self.context.load(applicant_id)?;
        status::ensure_payable(record.account.status)?;

        let placement = self.placement(&record);
        let mut errors = ValidationErrors::new();
        check_amount(&mut errors, amount, placement.fee.as_ref());
        errors.into_result()?;

        let order_id = format!("ORDER_{}_{}", applicant_id, self.context.now().timestamp());
        let customer_name = record
            .form
            .personal
            .as_ref()
            .and_then(|personal| personal.apar_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Applicant")
            .to_string();
        let request = GatewayOrderRequest {
            order_id: order_id.clone(),
            order_amount: amount,
            order_currency: "INR".to_string(),
            customer_details: CustomerDetails {
                customer_id: applicant_id.to_string(),
                customer_email: record.account.email.clone(),
                customer_phone: customer_phone(&record.account.mobile),
                customer_name,
            },
            order_meta: OrderMeta {
                return_url: format!(
                    "{}/applicant/fee?order_id={{order_id}}",
                    self.context.config.public_base_url
                ),
            },
        };

        let created = gateway.create_order(&request).await.map_err(|err| {
            warn!(%applicant_id, %order_id, error = %err, "gateway order creation failed");
            err
        })?;
        info!(%applicant_id, %order_id, %amount, "gateway order created");

        Ok(GatewayOrderView {
            payment_session_id: created.payment_session_id,
            order_id,
            mode: gateway.mode(),
        })
    }

    pub async fn verify_gateway_order(
        &self,
        applicant_id: ApplicantId,
        order_id: &str,
    ) -> Result<VerificationOutcome, PaymentError> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(PaymentError::MissingOrderId);
        }
        let gateway = self.gateway.as_ref().ok_or(PaymentError::NotConfigured)?;
        if !order_id.starts_with(&format!("ORDER_{applicant_id}_")) {
            return Err(PaymentError::OrderNotOwned);
        }

        let order = gateway.fetch_order(order_id).await.map_err(|err| {
            warn!(%applicant_id, %order_id, error = %err, "gateway order lookup failed");
            err
        })?;
        if !order.is_paid() {
            return Ok(VerificationOutcome {
                success: false,
                message: format!("Payment not completed. Status: {}", order.order_status),
            });
        }
        if self.context.ledger.find_by_transaction(order_id)?.is_some() {
            return Ok(already_processed());
        }

        // The gateway already holds the money, so the rows are written even
        // when the application has left `Approved` since the order was made.
        let record = self.context.load(applicant_id)?;
        let placement = self.placement(&record);
        let now = self.context.now();

        let registration = FinalRegistration {
            id: 0,
            applicant_id,
            institute_id: placement.institute_id,
            branch_id: placement.branch_id,
            payment_method: PaymentMethod::Cashfree,
            payment_status: RegistrationPaymentStatus::Completed,
            amount: order.order_amount,
            transaction_id: order_id.to_string(),
            bank_name: None,
            transaction_date: now.date_naive(),
            proof_document: None,
            application_snapshot: ApplicationSnapshot::from(&record).to_json(),
            created_at: now,
        };
        let payment = AdmissionPayment {
            institute_id: placement.institute_id,
            branch_id: placement.branch_id,
            applicant_id,
            payment_group: PAYMENT_GROUP.to_string(),
            amount: order.order_amount,
            transaction_date: now.date_naive(),
            transaction_id: order_id.to_string(),
            bank_name: None,
            bank_branch_name: None,
            payment_mode: PaymentMode::Online,
            payment_proof: None,
            status: LedgerStatus::Verified,
        };

        let registration = match self.context.ledger.record(registration, payment) {
            Ok(registration) => registration,
            Err(RepositoryError::Conflict) => return Ok(already_processed()),
            Err(err) => return Err(err.into()),
        };
        info!(%applicant_id, %order_id, amount = %registration.amount, "gateway payment recorded");

        if status::ensure_payable(record.account.status).is_err() {
            warn!(
                %applicant_id,
                %order_id,
                amount = %registration.amount,
                status = %record.account.status,
                "paid order for an application that is not awaiting payment; refund manually"
            );
            return Ok(VerificationOutcome {
                success: false,
                message: format!(
                    "Payment received, but the application is {} and not awaiting payment. \
                     The admission office will arrange a refund.",
                    record.account.status
                ),
            });
        }

        let record = self.register(record)?;
        self.context.notify(
            Notification::new(
                NotificationTemplate::RegistrationSuccess,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("transaction_id", order_id)
            .detail("amount", registration.amount.to_string()),
        );

        Ok(VerificationOutcome {
            success: true,
            message: "Payment verified and registration complete.".to_string(),
        })
    }

    /// Administrator's verdict on a pending bank transfer.
    pub fn reconcile_bank_transfer(
        &self,
        transaction_id: &str,
        verified: bool,
    ) -> Result<LedgerEntry, PaymentError> {
        let transaction_id = transaction_id.trim();
        let entry = self
            .context
            .ledger
            .find_by_transaction(transaction_id)?
            .ok_or(RepositoryError::NotFound)?;
        if entry.payment.status != LedgerStatus::Pending {
            return Err(PaymentError::AlreadySettled(entry.payment.status));
        }

        let outcome = if verified {
            LedgerStatus::Verified
        } else {
            LedgerStatus::Failed
        };
        let entry = self.context.ledger.settle(transaction_id, outcome)?;
        info!(
            applicant_id = %entry.payment.applicant_id,
            %transaction_id,
            status = outcome.label(),
            "bank transfer reconciled"
        );
        if !verified {
            self.reopen_payment(&entry)?;
        }
        Ok(entry)
    }

    pub fn history(&self, applicant_id: ApplicantId) -> Result<Vec<FinalRegistration>, PaymentError> {
        Ok(self.context.ledger.for_applicant(applicant_id)?)
    }

    fn placement(&self, record: &ApplicantRecord) -> Placement {
        let programme = record.form.programme.as_ref();
        let branch_id = programme.and_then(|details| details.region_code.trim().parse::<u64>().ok());
        let institute_id = branch_id
            .and_then(|branch| self.context.catalog.institute_for_branch(branch))
            .map(|institute| institute.id);
        let fee = match (branch_id, programme) {
            (Some(branch), Some(details)) => self
                .context
                .catalog
                .fee_schedule(branch, details.programme_enrollment.trim()),
            _ => None,
        };
        Placement {
            institute_id,
            branch_id,
            fee,
        }
    }

    /// Sends a registered applicant back to the fee page after their only
    /// outstanding payment was rejected.
    fn reopen_payment(&self, rejected: &LedgerEntry) -> Result<(), PaymentError> {
        let applicant_id = rejected.payment.applicant_id;
        let still_covered = self
            .context
            .ledger
            .for_applicant(applicant_id)?
            .iter()
            .any(|registration| {
                registration.transaction_id != rejected.registration.transaction_id
                    && registration.payment_status != RegistrationPaymentStatus::Failed
            });
        if still_covered {
            info!(%applicant_id, "another payment still covers the applicant; status kept");
            return Ok(());
        }

        let mut record = self.context.load(applicant_id)?;
        record.account.status =
            status::transition(record.account.status, WorkflowEvent::PaymentFailed)?;
        self.context.applicants.update(record.clone())?;
        info!(%applicant_id, "registration reopened for payment");

        self.context.notify(
            Notification::new(
                NotificationTemplate::PaymentRejected,
                applicant_id,
                &record.account.email,
            )
            .detail("username", record.account.username.as_str())
            .detail("transaction_id", rejected.registration.transaction_id.as_str())
            .detail("amount", rejected.registration.amount.to_string())
            .detail(
                "fee_url",
                format!("{}/applicant/fee", self.context.config.public_base_url),
            ),
        );
        Ok(())
    }

    fn register(&self, mut record: ApplicantRecord) -> Result<ApplicantRecord, PaymentError> {
        record.account.status =
            status::transition(record.account.status, WorkflowEvent::Register)?;
        self.context.applicants.update(record.clone())?;
        info!(applicant_id = %record.id(), "applicant registered");
        Ok(record)
    }
}

fn already_processed() -> VerificationOutcome {
    VerificationOutcome {
        success: true,
        message: "Payment already processed.".to_string(),
    }
}

fn check_amount(errors: &mut ValidationErrors, amount: Amount, fee: Option<&FeeSchedule>) {
    if amount.is_zero() {
        errors.add("amount", "The amount must be greater than zero.");
        return;
    }
    if let Some(fee) = fee {
        let expected = fee.total();
        if amount != expected {
            errors.add(
                "amount",
                format!("The amount must equal the admission fee of {expected}."),
            );
        }
    }
}

fn check_proof(errors: &mut ValidationErrors, proof: &ProofDocument) {
    validation::required_max(errors, "proof_document.storage_key", &proof.storage_key, 255);

    let extension = Path::new(proof.original_name.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension {
        Some(ext) if PROOF_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => errors.add(
            "proof_document",
            "The proof document must be a file of type: jpg, jpeg, png, pdf.",
        ),
    }

    if proof.file_size == 0 {
        errors.add("proof_document", "The proof document is empty.");
    } else if proof.file_size > MAX_PROOF_BYTES {
        errors.add(
            "proof_document",
            format!(
                "The proof document may not be greater than {} kilobytes.",
                MAX_PROOF_BYTES / 1024
            ),
        );
    }
}

/// Last ten digits of the mobile number, as the gateway requires.
fn customer_phone(mobile: &str) -> String {
    let digits: Vec<char> = mobile.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 10 {
        return FALLBACK_PHONE.to_string();
    }
    digits[digits.len() - 10..].iter().collect()
}
