use chrono::NaiveDate;

use super::common::*;
use crate::workflows::admission::domain::ApplicantStatus;
use crate::workflows::admission::payments::{
    BankTransferRequest, LedgerStatus, PaymentError, PaymentMethod, PaymentMode, ProofDocument,
    RegistrationPaymentStatus, PAYMENT_GROUP,
};
use crate::workflows::admission::repository::{
    ApplicantRepository, NotificationTemplate, RepositoryError,
};
use crate::workflows::admission::status::WorkflowError;
use crate::workflows::money::Amount;

fn bank_transfer(transaction_id: &str) -> BankTransferRequest {
    BankTransferRequest {
        amount: seeded_fee(),
        transaction_id: transaction_id.to_string(),
        bank_name: "State Bank of India".to_string(),
        transaction_date: NaiveDate::from_ymd_opt(2026, 1, 2).expect("valid date"),
        proof_document: ProofDocument {
            storage_key: "proofs/utr-001.pdf".to_string(),
            original_name: "utr-001.pdf".to_string(),
            file_size: 240_000,
        },
    }
}

#[test]
fn gateways_reflect_configuration() {
    let harness = harness();
    let options = harness.portal.payments.active_gateways();
    assert_eq!(options.gateways.len(), 1);
    assert_eq!(options.gateways[0].id, "cashfree");
    assert_eq!(options.bank_transfer, Some(bank_details()));

    let offline = harness_with(FakeGateway::default(), ScriptedVerifier::default(), false);
    assert!(offline.portal.payments.active_gateways().gateways.is_empty());
}

#[tokio::test]
async fn fee_schedule_follows_branch_and_programme() {
    let harness = harness();
    let (id, _) = harness.completed_applicant("meera").await;

    let schedule = harness
        .portal
        .payments
        .fee_schedule_for(id)
        .expect("lookup")
        .expect("schedule published");
    assert_eq!(schedule.total(), seeded_fee());
}

#[tokio::test]
async fn payment_requires_approval() {
    let harness = harness();
    let (id, _) = harness.completed_applicant("meera").await;
    harness.portal.review.submit(id).expect("submitted");

    match harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
    {
        Err(PaymentError::Workflow(WorkflowError::PaymentNotAllowed { status })) => {
            assert_eq!(status, ApplicantStatus::Submitted)
        }
        other => panic!("expected payment refusal, got {other:?}"),
    }
    assert!(harness.ledger.entries().is_empty());
}

#[tokio::test]
async fn bank_transfer_writes_pending_ledger_and_registers() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;

    let registration = harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
        .expect("transfer recorded");

    assert_eq!(registration.payment_method, PaymentMethod::BankTransfer);
    assert_eq!(registration.payment_status, RegistrationPaymentStatus::Pending);
    assert_eq!(registration.branch_id, Some(1));
    assert_eq!(registration.institute_id, Some(1));
    assert_eq!(
        registration.application_snapshot["username"],
        serde_json::json!("meera")
    );

    let entries = harness.ledger.entries();
    assert_eq!(entries.len(), 1);
    let payment = &entries[0].payment;
    assert_eq!(payment.status, LedgerStatus::Pending);
    assert_eq!(payment.payment_mode, PaymentMode::BankTransfer);
    assert_eq!(payment.payment_group, PAYMENT_GROUP);
    assert_eq!(payment.payment_proof.as_deref(), Some("proofs/utr-001.pdf"));

    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Registered);
    assert!(harness
        .mailer
        .templates()
        .contains(&NotificationTemplate::PaymentVerification));
}

#[tokio::test]
async fn bank_transfer_validates_amount_and_proof() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;

    let mut request = bank_transfer("");
    request.amount = Amount::from_rupees(100);
    request.proof_document.original_name = "receipt.exe".to_string();

    match harness.portal.payments.submit_bank_transfer(id, request) {
        Err(PaymentError::Validation(errors)) => {
            assert!(errors.has("amount"));
            assert!(errors.has("transaction_id"));
            assert!(errors.has("proof_document"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Approved);
}

#[tokio::test]
async fn duplicate_transaction_id_is_a_conflict() {
    let harness = harness();
    let (first, _) = harness.approved_applicant("meera").await;
    let (second, _) = harness.approved_applicant("arjun").await;

    harness
        .portal
        .payments
        .submit_bank_transfer(first, bank_transfer("UTR001"))
        .expect("first transfer");
    assert!(matches!(
        harness
            .portal
            .payments
            .submit_bank_transfer(second, bank_transfer("UTR001")),
        Err(PaymentError::Repository(RepositoryError::Conflict))
    ));

    let record = harness.applicants.fetch(second).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Approved);
    assert_eq!(harness.ledger.entries().len(), 1);
}

#[tokio::test]
async fn reconcile_settles_pending_transfers_once() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;
    harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
        .expect("transfer recorded");

    let entry = harness
        .portal
        .payments
        .reconcile_bank_transfer("UTR001", true)
        .expect("reconciled");
    assert_eq!(entry.payment.status, LedgerStatus::Verified);
    assert_eq!(
        entry.registration.payment_status,
        RegistrationPaymentStatus::Completed
    );

    assert!(matches!(
        harness.portal.payments.reconcile_bank_transfer("UTR001", false),
        Err(PaymentError::AlreadySettled(LedgerStatus::Verified))
    ));
    assert!(matches!(
        harness.portal.payments.reconcile_bank_transfer("UTR404", true),
        Err(PaymentError::Repository(RepositoryError::NotFound))
    ));
}

#[tokio::test]
async fn gateway_order_carries_customer_and_return_url() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;

    let view = harness
        .portal
        .payments
        .create_gateway_order(id, seeded_fee())
        .await
        .expect("order created");

    let expected_order = format!("ORDER_{}_{}", id, harness.clock_now_unix());
    assert_eq!(view.order_id, expected_order);
    assert_eq!(view.payment_session_id, format!("session_{expected_order}"));
    assert_eq!(view.mode, "sandbox");

    let created = harness.gateway.created();
    assert_eq!(created.len(), 1);
    let order = &created[0];
    assert_eq!(order.order_currency, "INR");
    assert_eq!(order.customer_details.customer_name, "Meera Nair");
    assert_eq!(order.customer_details.customer_phone.len(), 10);
    assert_eq!(
        order.order_meta.return_url,
        "https://admissions.example.edu/applicant/fee?order_id={order_id}"
    );
}

#[tokio::test]
async fn gateway_failures_are_reported() {
    let harness = harness_with(FakeGateway::rejecting(), ScriptedVerifier::default(), true);
    let (id, _) = harness.approved_applicant("meera").await;

    match harness
        .portal
        .payments
        .create_gateway_order(id, seeded_fee())
        .await
    {
        Err(PaymentError::Gateway(err)) => assert_eq!(err.to_string(), "order_amount is invalid"),
        other => panic!("expected gateway error, got {other:?}"),
    }

    let offline = harness_with(FakeGateway::default(), ScriptedVerifier::default(), false);
    let (id, _) = offline.approved_applicant("arjun").await;
    assert!(matches!(
        offline
            .portal
            .payments
            .create_gateway_order(id, seeded_fee())
            .await,
        Err(PaymentError::NotConfigured)
    ));
}

#[tokio::test]
async fn paid_order_registers_the_applicant_once() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;
    let view = harness
        .portal
        .payments
        .create_gateway_order(id, seeded_fee())
        .await
        .expect("order created");

    let pending = harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("status checked");
    assert!(!pending.success);
    assert_eq!(pending.message, "Payment not completed. Status: ACTIVE");

    harness.gateway.set_status(&view.order_id, "PAID");
    let outcome = harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("verified");
    assert!(outcome.success);
    assert_eq!(outcome.message, "Payment verified and registration complete.");

    let again = harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("idempotent");
    assert_eq!(again.message, "Payment already processed.");

    let entries = harness.ledger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payment.status, LedgerStatus::Verified);
    assert_eq!(entries[0].payment.payment_mode, PaymentMode::Online);
    assert_eq!(entries[0].registration.amount, seeded_fee());

    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Registered);
    assert!(harness
        .mailer
        .templates()
        .contains(&NotificationTemplate::RegistrationSuccess));

    let history = harness.portal.payments.history(id).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].payment_method, PaymentMethod::Cashfree);
}

#[tokio::test]
async fn rejected_transfer_reopens_the_fee_page() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;
    harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
        .expect("transfer recorded");

    let entry = harness
        .portal
        .payments
        .reconcile_bank_transfer("UTR001", false)
        .expect("reconciled");
    assert_eq!(entry.payment.status, LedgerStatus::Failed);
    assert_eq!(
        entry.registration.payment_status,
        RegistrationPaymentStatus::Failed
    );

    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Approved);
    let mail = harness
        .mailer
        .sent()
        .into_iter()
        .find(|n| n.template == NotificationTemplate::PaymentRejected)
        .expect("rejection mail");
    assert_eq!(mail.details["transaction_id"], "UTR001");
    assert_eq!(
        mail.details["fee_url"],
        "https://admissions.example.edu/applicant/fee"
    );

    let retry = harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR002"))
        .expect("second attempt accepted");
    assert_eq!(retry.payment_status, RegistrationPaymentStatus::Pending);
    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Registered);
    assert_eq!(harness.portal.payments.history(id).expect("history").len(), 2);
}

#[tokio::test]
async fn rejected_transfer_keeps_status_when_another_payment_covers_it() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;
    let view = harness
        .portal
        .payments
        .create_gateway_order(id, seeded_fee())
        .await
        .expect("order created");
    harness.gateway.set_status(&view.order_id, "PAID");
    harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("verified");

    // A stale pending transfer from the same applicant.
    harness.applicants.force_status(id, ApplicantStatus::Approved);
    harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
        .expect("transfer recorded");

    harness
        .portal
        .payments
        .reconcile_bank_transfer("UTR001", false)
        .expect("reconciled");
    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Registered);
    assert!(!harness
        .mailer
        .templates()
        .contains(&NotificationTemplate::PaymentRejected));
}

#[tokio::test]
async fn paid_order_is_recorded_after_the_applicant_paid_another_way() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;
    let view = harness
        .portal
        .payments
        .create_gateway_order(id, seeded_fee())
        .await
        .expect("order created");
    harness
        .portal
        .payments
        .submit_bank_transfer(id, bank_transfer("UTR001"))
        .expect("transfer recorded");

    harness.gateway.set_status(&view.order_id, "PAID");
    let outcome = harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("payment recorded");
    assert!(!outcome.success);
    assert_eq!(
        outcome.message,
        "Payment received, but the application is Registered and not awaiting payment. \
         The admission office will arrange a refund."
    );

    let entries = harness.ledger.entries();
    assert_eq!(entries.len(), 2);
    let online = entries
        .iter()
        .find(|entry| entry.registration.transaction_id == view.order_id)
        .expect("online row");
    assert_eq!(online.payment.status, LedgerStatus::Verified);
    assert_eq!(online.payment.payment_mode, PaymentMode::Online);

    let record = harness.applicants.fetch(id).expect("fetch").expect("record");
    assert_eq!(record.account.status, ApplicantStatus::Registered);
    assert!(!harness
        .mailer
        .templates()
        .contains(&NotificationTemplate::RegistrationSuccess));

    let again = harness
        .portal
        .payments
        .verify_gateway_order(id, &view.order_id)
        .await
        .expect("idempotent");
    assert_eq!(again.message, "Payment already processed.");
}

#[tokio::test]
async fn orders_of_other_applicants_are_refused() {
    let harness = harness();
    let (id, _) = harness.approved_applicant("meera").await;

    assert!(matches!(
        harness
            .portal
            .payments
            .verify_gateway_order(id, "ORDER_999_1767258000")
            .await,
        Err(PaymentError::OrderNotOwned)
    ));
    assert!(matches!(
        harness.portal.payments.verify_gateway_order(id, "  ").await,
        Err(PaymentError::MissingOrderId)
    ));
}

impl Harness {
    fn clock_now_unix(&self) -> i64 {
        use crate::workflows::admission::repository::Clock;
        self.clock.now().timestamp()
    }
}
