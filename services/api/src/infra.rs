use admission_portal::workflows::admission::payments::{
    AdmissionPayment, CreatedOrder, FinalRegistration, GatewayError, GatewayOrder,
    GatewayOrderRequest, LedgerEntry, LedgerStatus, PaymentGateway,
};
use admission_portal::workflows::admission::{
    ApplicantAccount, ApplicantId, ApplicantRecord, ApplicantRepository, ApplicantStatus,
    ApplicationForm, Mailer, MailerError, NewApplicant, Notification, RegistrationLedger,
    RepositoryError,
};
use admission_portal::workflows::money::Amount;
use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct ApplicantStore {
    last_id: u64,
    records: BTreeMap<ApplicantId, ApplicantRecord>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicantRepository {
    store: Arc<Mutex<ApplicantStore>>,
}

impl InMemoryApplicantRepository {
    fn find(
        &self,
        matches: impl Fn(&ApplicantAccount) -> bool,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .records
            .values()
            .find(|record| matches(&record.account))
            .cloned())
    }
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let duplicate = guard.records.values().any(|record| {
            let account = &record.account;
            account.username == applicant.username
                || account.email.eq_ignore_ascii_case(&applicant.email)
                || account.mobile == applicant.mobile
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        guard.last_id += 1;
        let id = ApplicantId(guard.last_id);
        let record = ApplicantRecord {
            account: ApplicantAccount {
                id,
                username: applicant.username,
                email: applicant.email,
                mobile: applicant.mobile,
                password: applicant.password,
                email_verified_at: None,
                otp: Some(applicant.otp),
                status: ApplicantStatus::Draft,
                submitted_at: None,
                rejection_reason: None,
                created_at: applicant.created_at,
            },
            form: ApplicationForm::default(),
        };
        guard.records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicantRecord) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        let id = record.id();
        if guard.records.contains_key(&id) {
            guard.records.insert(id, record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.records.get(&id).cloned())
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.find(|account| account.username == username)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.find(|account| account.email.eq_ignore_ascii_case(email))
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.find(|account| account.mobile == mobile)
    }

    fn by_status(
        &self,
        status: ApplicantStatus,
        limit: usize,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        let mut records: Vec<ApplicantRecord> = guard
            .records
            .values()
            .filter(|record| record.account.status == status)
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.account.submitted_at, record.id()));
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistrationLedger {
    rows: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl RegistrationLedger for InMemoryRegistrationLedger {
    fn record(
        &self,
        mut registration: FinalRegistration,
        payment: AdmissionPayment,
    ) -> Result<FinalRegistration, RepositoryError> {
        let mut rows = self.rows.lock().expect("ledger mutex poisoned");
        if rows
            .iter()
            .any(|row| row.registration.transaction_id == registration.transaction_id)
        {
            return Err(RepositoryError::Conflict);
        }
        registration.id = rows.len() as u64 + 1;
        rows.push(LedgerEntry {
            registration: registration.clone(),
            payment,
        });
        Ok(registration)
    }

    fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>, RepositoryError> {
        let rows = self.rows.lock().expect("ledger mutex poisoned");
        Ok(rows
            .iter()
            .find(|row| row.registration.transaction_id == transaction_id)
            .cloned())
    }

    fn for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<FinalRegistration>, RepositoryError> {
        let rows = self.rows.lock().expect("ledger mutex poisoned");
        Ok(rows
            .iter()
            .rev()
            .filter(|row| row.registration.applicant_id == applicant_id)
            .map(|row| row.registration.clone())
            .collect())
    }

    fn settle(
        &self,
        transaction_id: &str,
        status: LedgerStatus,
    ) -> Result<LedgerEntry, RepositoryError> {
        let mut rows = self.rows.lock().expect("ledger mutex poisoned");
        let row = rows
            .iter_mut()
            .find(|row| row.registration.transaction_id == transaction_id)
            .ok_or(RepositoryError::NotFound)?;
        row.settle(status);
        Ok(row.clone())
    }
}

/// Keeps every notification and logs it; no mail leaves the process.
#[derive(Default, Clone)]
pub(crate) struct OutboxMailer {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl OutboxMailer {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.outbox.lock().expect("outbox mutex poisoned").clone()
    }

    /// Most recent value of `key` in a notification sent to `recipient`.
    pub(crate) fn latest_detail(&self, recipient: &str, key: &str) -> Option<String> {
        self.notifications()
            .into_iter()
            .rev()
            .filter(|notification| notification.recipient == recipient)
            .find_map(|notification| notification.details.get(key).cloned())
    }
}

impl Mailer for OutboxMailer {
    fn send(&self, notification: Notification) -> Result<(), MailerError> {
        info!(
            template = notification.template.label(),
            applicant_id = %notification.applicant_id,
            recipient = %notification.recipient,
            "notification queued"
        );
        let mut guard = self.outbox.lock().expect("outbox mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

/// Offline stand-in for the Cashfree checkout used by the CLI demo.
#[derive(Default, Clone)]
pub(crate) struct SimulatedGateway {
    orders: Arc<Mutex<HashMap<String, (Amount, String)>>>,
}

impl SimulatedGateway {
    /// Marks the order as paid, as if the applicant finished checkout.
    pub(crate) fn complete_checkout(&self, order_id: &str) {
        let mut guard = self.orders.lock().expect("gateway mutex poisoned");
        if let Some((_, status)) = guard.get_mut(order_id) {
            *status = "PAID".to_string();
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn mode(&self) -> &'static str {
        "sandbox"
    }

    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        let mut guard = self.orders.lock().expect("gateway mutex poisoned");
        guard.insert(
            request.order_id.clone(),
            (request.order_amount, "ACTIVE".to_string()),
        );
        Ok(CreatedOrder {
            payment_session_id: format!("session_{}", request.order_id),
        })
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        let guard = self.orders.lock().expect("gateway mutex poisoned");
        let (amount, status) = guard.get(order_id).ok_or_else(|| GatewayError::Rejected {
            status: 404,
            message: format!("order {order_id} not found"),
        })?;
        Ok(GatewayOrder {
            order_id: order_id.to_string(),
            order_status: status.clone(),
            order_amount: *amount,
        })
    }
}
