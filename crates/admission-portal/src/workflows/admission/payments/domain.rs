use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflows::admission::domain::ApplicantId;
use crate::workflows::money::Amount;

/// Ledger group every admission fee is booked under.
pub const PAYMENT_GROUP: &str = "Online Admission";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cashfree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Verified,
    Failed,
}

impl LedgerStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Verified => "verified",
            LedgerStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Online")]
    Online,
}

/// Audit snapshot written when an applicant pays the admission fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRegistration {
    pub id: u64,
    pub applicant_id: ApplicantId,
    pub institute_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub payment_method: PaymentMethod,
    pub payment_status: RegistrationPaymentStatus,
    pub amount: Amount,
    pub transaction_id: String,
    pub bank_name: Option<String>,
    pub transaction_date: NaiveDate,
    pub proof_document: Option<String>,
    /// Application as it stood at payment time.
    pub application_snapshot: Value,
    pub created_at: DateTime<Utc>,
}

/// Accounting-side record kept alongside each final registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPayment {
    pub institute_id: Option<u64>,
    pub branch_id: Option<u64>,
    pub applicant_id: ApplicantId,
    pub payment_group: String,
    pub amount: Amount,
    pub transaction_date: NaiveDate,
    pub transaction_id: String,
    pub bank_name: Option<String>,
    pub bank_branch_name: Option<String>,
    pub payment_mode: PaymentMode,
    pub payment_proof: Option<String>,
    pub status: LedgerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub registration: FinalRegistration,
    pub payment: AdmissionPayment,
}

impl LedgerEntry {
    /// Moves the payment row to `status` and mirrors a final verdict onto
    /// the registration.
    pub fn settle(&mut self, status: LedgerStatus) {
        self.payment.status = status;
        match status {
            LedgerStatus::Verified => {
                self.registration.payment_status = RegistrationPaymentStatus::Completed
            }
            LedgerStatus::Failed => {
                self.registration.payment_status = RegistrationPaymentStatus::Failed
            }
            LedgerStatus::Pending => {}
        }
    }
}

/// Uploaded proof of a bank transfer; only metadata is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofDocument {
    pub storage_key: String,
    pub original_name: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BankTransferRequest {
    pub amount: Amount,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub bank_name: String,
    pub transaction_date: NaiveDate,
    pub proof_document: ProofDocument,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayDescriptor {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderView {
    pub payment_session_id: String,
    pub order_id: String,
    pub mode: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
}
