pub mod domain;
pub mod gateway;
mod service;

pub use domain::{
    AdmissionPayment, BankTransferRequest, FinalRegistration, GatewayDescriptor,
    GatewayOrderView, LedgerEntry, LedgerStatus, PaymentMethod, PaymentMode, ProofDocument,
    RegistrationPaymentStatus, VerificationOutcome, PAYMENT_GROUP,
};
pub use gateway::{
    CashfreeClient, CreatedOrder, GatewayError, GatewayOrder, GatewayOrderRequest,
    PaymentGateway, RetryPolicy,
};
pub use service::{PaymentError, PaymentOptions, PaymentService};
