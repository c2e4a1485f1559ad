use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::{BankTransferDetails, PortalConfig};
use crate::workflows::admission::domain::{
    ApplicantAccount, ApplicantId, ApplicantRecord, ApplicantStatus, ApplicationForm,
    CorrespondenceDetails, DocumentType, NewApplicant, PersonalDetails, ProgrammeDetails,
};
use crate::workflows::admission::payments::gateway::{
    CreatedOrder, GatewayError, GatewayOrder, GatewayOrderRequest, PaymentGateway,
};
use crate::workflows::admission::payments::{
    AdmissionPayment, FinalRegistration, LedgerEntry, LedgerStatus,
};
use crate::workflows::admission::repository::{
    ApplicantRepository, Clock, Mailer, MailerError, Notification, NotificationTemplate,
    RegistrationLedger, RepositoryError,
};
use crate::workflows::admission::uploads::{
    ImageVerifier, UploadRequest, VerificationVerdict, VerifierError,
};
use crate::workflows::admission::wizard::{QualificationInput, QualificationRequest};
use crate::workflows::admission::{
    admission_router, AdmissionPortal, LoginOutcome, PortalDependencies, RegistrationRequest,
};
use crate::workflows::catalog::{Catalog, InMemoryCatalog};
use crate::workflows::forms::InMemoryForms;
use crate::workflows::money::Amount;

pub(super) const ADMIN_TOKEN: &str = "admin-secret";
pub(super) const PASSWORD: &str = "s3cret-pass";

/// Fee total seeded for branch 1 / DIPN.
pub(super) fn seeded_fee() -> Amount {
    InMemoryCatalog::seeded()
        .fee_schedule(1, "DIPN")
        .expect("seeded schedule")
        .total()
}

#[derive(Default)]
struct ApplicantTable {
    next_id: u64,
    records: BTreeMap<ApplicantId, ApplicantRecord>,
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplicants {
    table: Arc<Mutex<ApplicantTable>>,
}

impl MemoryApplicants {
    pub(super) fn force_status(&self, id: ApplicantId, status: ApplicantStatus) {
        let mut table = self.table.lock().expect("applicant mutex poisoned");
        let record = table.records.get_mut(&id).expect("applicant exists");
        record.account.status = status;
    }
}

impl ApplicantRepository for MemoryApplicants {
    fn insert(&self, applicant: NewApplicant) -> Result<ApplicantRecord, RepositoryError> {
        let mut table = self.table.lock().expect("applicant mutex poisoned");
        let taken = table.records.values().any(|record| {
            record.account.username == applicant.username
                || record.account.email.eq_ignore_ascii_case(&applicant.email)
                || record.account.mobile == applicant.mobile
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }

        table.next_id += 1;
        let id = ApplicantId(table.next_id);
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
        table.records.insert(id, record.clone());
        Ok(record)
    }

    fn update(&self, record: ApplicantRecord) -> Result<(), RepositoryError> {
        let mut table = self.table.lock().expect("applicant mutex poisoned");
        match table.records.get_mut(&record.id()) {
            Some(slot) => {
                *slot = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: ApplicantId) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let table = self.table.lock().expect("applicant mutex poisoned");
        Ok(table.records.get(&id).cloned())
    }

    fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let table = self.table.lock().expect("applicant mutex poisoned");
        Ok(table
            .records
            .values()
            .find(|record| record.account.username == username)
            .cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let table = self.table.lock().expect("applicant mutex poisoned");
        Ok(table
            .records
            .values()
            .find(|record| record.account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn find_by_mobile(&self, mobile: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let table = self.table.lock().expect("applicant mutex poisoned");
        Ok(table
            .records
            .values()
            .find(|record| record.account.mobile == mobile)
            .cloned())
    }

    fn by_status(
        &self,
        status: ApplicantStatus,
        limit: usize,
    ) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        let table = self.table.lock().expect("applicant mutex poisoned");
        let mut matching: Vec<ApplicantRecord> = table
            .records
            .values()
            .filter(|record| record.account.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|record| (record.account.submitted_at, record.id()));
        matching.truncate(limit);
        Ok(matching)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryLedger {
    entries: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl MemoryLedger {
    pub(super) fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().expect("ledger mutex poisoned").clone()
    }
}

impl RegistrationLedger for MemoryLedger {
    fn record(
        &self,
        mut registration: FinalRegistration,
        payment: AdmissionPayment,
    ) -> Result<FinalRegistration, RepositoryError> {
        let mut entries = self.entries.lock().expect("ledger mutex poisoned");
        if entries
            .iter()
            .any(|entry| entry.registration.transaction_id == registration.transaction_id)
        {
            return Err(RepositoryError::Conflict);
        }
        registration.id = entries.len() as u64 + 1;
        entries.push(LedgerEntry {
            registration: registration.clone(),
            payment,
        });
        Ok(registration)
    }

    fn find_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LedgerEntry>, RepositoryError> {
        let entries = self.entries.lock().expect("ledger mutex poisoned");
        Ok(entries
            .iter()
            .find(|entry| entry.registration.transaction_id == transaction_id)
            .cloned())
    }

    fn for_applicant(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Vec<FinalRegistration>, RepositoryError> {
        let entries = self.entries.lock().expect("ledger mutex poisoned");
        Ok(entries
            .iter()
            .rev()
            .filter(|entry| entry.registration.applicant_id == applicant_id)
            .map(|entry| entry.registration.clone())
            .collect())
    }

    fn settle(
        &self,
        transaction_id: &str,
        status: LedgerStatus,
    ) -> Result<LedgerEntry, RepositoryError> {
        let mut entries = self.entries.lock().expect("ledger mutex poisoned");
        let entry = entries
            .iter_mut()
            .find(|entry| entry.registration.transaction_id == transaction_id)
            .ok_or(RepositoryError::NotFound)?;
        entry.settle(status);
        Ok(entry.clone())
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingMailer {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<NotificationTemplate> {
        self.sent().into_iter().map(|n| n.template).collect()
    }

    /// Code carried by the most recent OTP mail to `email`.
    pub(super) fn last_otp(&self, email: &str) -> String {
        self.sent()
            .into_iter()
            .rev()
            .find(|n| n.recipient == email && n.details.contains_key("otp"))
            .and_then(|n| n.details.get("otp").cloned())
            .expect("otp mail sent")
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, notification: Notification) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _notification: Notification) -> Result<(), MailerError> {
        Err(MailerError::Transport("smtp offline".to_string()))
    }
}

#[derive(Clone)]
pub(super) struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub(super) fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
            .single()
            .expect("valid start");
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Gateway double keyed by order id.
#[derive(Default, Clone)]
pub(super) struct FakeGateway {
    created: Arc<Mutex<Vec<GatewayOrderRequest>>>,
    statuses: Arc<Mutex<HashMap<String, String>>>,
    pub(super) reject_orders: bool,
}

impl FakeGateway {
    pub(super) fn rejecting() -> Self {
        Self {
            reject_orders: true,
            ..Self::default()
        }
    }

    pub(super) fn created(&self) -> Vec<GatewayOrderRequest> {
        self.created.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn set_status(&self, order_id: &str, status: &str) {
        self.statuses
            .lock()
            .expect("gateway mutex poisoned")
            .insert(order_id.to_string(), status.to_string());
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn mode(&self) -> &'static str {
        "sandbox"
    }

    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<CreatedOrder, GatewayError> {
        if self.reject_orders {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "order_amount is invalid".to_string(),
            });
        }
        self.created
            .lock()
            .expect("gateway mutex poisoned")
            .push(request.clone());
        self.set_status(&request.order_id, "ACTIVE");
        Ok(CreatedOrder {
            payment_session_id: format!("session_{}", request.order_id),
        })
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, GatewayError> {
        let status = self
            .statuses
            .lock()
            .expect("gateway mutex poisoned")
            .get(order_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: "order not found".to_string(),
            })?;
        let amount = self
            .created()
            .into_iter()
            .find(|order| order.order_id == order_id)
            .map(|order| order.order_amount)
            .unwrap_or_else(seeded_fee);
        Ok(GatewayOrder {
            order_id: order_id.to_string(),
            order_status: status,
            order_amount: amount,
        })
    }
}

#[derive(Default, Clone)]
pub(super) struct ScriptedVerifier {
    pub(super) reject_with: Option<String>,
    checked: Arc<Mutex<Vec<(String, String)>>>,
}

impl ScriptedVerifier {
    pub(super) fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(super) fn checked(&self) -> Vec<(String, String)> {
        self.checked.lock().expect("verifier mutex poisoned").clone()
    }
}

#[async_trait]
impl ImageVerifier for ScriptedVerifier {
    async fn verify(
        &self,
        storage_key: &str,
        document_type: &DocumentType,
    ) -> Result<VerificationVerdict, VerifierError> {
        self.checked
            .lock()
            .expect("verifier mutex poisoned")
            .push((storage_key.to_string(), document_type.to_string()));
        Ok(match &self.reject_with {
            Some(message) => VerificationVerdict::rejected(message.clone()),
            None => VerificationVerdict::accepted(),
        })
    }
}

pub(super) struct Harness {
    pub(super) portal: Arc<AdmissionPortal>,
    pub(super) applicants: MemoryApplicants,
    pub(super) ledger: MemoryLedger,
    pub(super) mailer: RecordingMailer,
    pub(super) clock: FixedClock,
    pub(super) gateway: FakeGateway,
    pub(super) verifier: ScriptedVerifier,
    pub(super) forms: InMemoryForms,
}

pub(super) fn portal_config() -> PortalConfig {
    PortalConfig {
        public_base_url: "https://admissions.example.edu".to_string(),
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..PortalConfig::default()
    }
}

pub(super) fn bank_details() -> BankTransferDetails {
    BankTransferDetails {
        account_name: "Tech University Nursing College".to_string(),
        account_number: "001122334455".to_string(),
        ifsc: "SBIN0000123".to_string(),
        bank_name: "State Bank of India".to_string(),
    }
}

pub(super) fn harness() -> Harness {
    harness_with(FakeGateway::default(), ScriptedVerifier::default(), true)
}

pub(super) fn harness_with(
    gateway: FakeGateway,
    verifier: ScriptedVerifier,
    with_gateway: bool,
) -> Harness {
    let applicants = MemoryApplicants::default();
    let ledger = MemoryLedger::default();
    let mailer = RecordingMailer::default();
    let clock = FixedClock::new();
    let forms = InMemoryForms::seeded();

    let dependencies = PortalDependencies {
        applicants: Arc::new(applicants.clone()),
        ledger: Arc::new(ledger.clone()),
        mailer: Arc::new(mailer.clone()),
        clock: Arc::new(clock.clone()),
        catalog: Arc::new(InMemoryCatalog::seeded()),
    };
    let mut builder = AdmissionPortal::builder(dependencies, portal_config())
        .verifier(Arc::new(verifier.clone()))
        .bank_transfer(Some(bank_details()))
        .forms(Arc::new(forms.clone()));
    if with_gateway {
        builder = builder.gateway(Arc::new(gateway.clone()));
    }

    Harness {
        portal: Arc::new(builder.build()),
        applicants,
        ledger,
        mailer,
        clock,
        gateway,
        verifier,
        forms,
    }
}

impl Harness {
    pub(super) fn router(&self) -> axum::Router {
        admission_router(self.portal.clone())
    }

    pub(super) fn register(&self, username: &str) -> String {
        let email = format!("{username}@example.com");
        let mobile = mobile_for(username);
        self.portal
            .accounts
            .register(registration_request(username, &email, &mobile))
            .expect("registration succeeds");
        email
    }

    /// Registers, verifies the OTP and returns the applicant with a session token.
    pub(super) fn verified_applicant(&self, username: &str) -> (ApplicantId, String) {
        let email = self.register(username);
        let otp = self.mailer.last_otp(&email);
        let grant = self
            .portal
            .accounts
            .verify_otp(&email, &otp)
            .expect("otp verifies");
        (grant.applicant.id, grant.token)
    }

    pub(super) async fn completed_applicant(&self, username: &str) -> (ApplicantId, String) {
        let (id, token) = self.verified_applicant(username);
        self.complete_form(id).await;
        (id, token)
    }

    pub(super) async fn complete_form(&self, id: ApplicantId) {
        let wizard = &self.portal.wizard;
        wizard
            .save_personal(id, personal_details())
            .expect("personal saved");
        wizard
            .save_programme(id, programme_details())
            .expect("programme saved");
        wizard
            .save_qualification(id, qualification_request())
            .expect("qualification saved");
        wizard
            .save_correspondence(id, correspondence_details())
            .expect("correspondence saved");
        for document in [DocumentType::PHOTO, DocumentType::SIGNATURE] {
            self.portal
                .uploads
                .store(id, upload_request(document))
                .await
                .expect("upload stored");
        }
    }

    pub(super) async fn approved_applicant(&self, username: &str) -> (ApplicantId, String) {
        let (id, token) = self.completed_applicant(username).await;
        self.portal.review.submit(id).expect("submitted");
        self.portal.review.approve(id).expect("approved");
        (id, token)
    }

    pub(super) fn login(&self, username: &str) -> LoginOutcome {
        self.portal
            .accounts
            .login(username, PASSWORD)
            .expect("login succeeds")
    }
}

fn mobile_for(username: &str) -> String {
    let seed: u64 = username.bytes().map(u64::from).sum();
    format!("98{:08}", seed)
}

pub(super) fn registration_request(username: &str, email: &str, mobile: &str) -> RegistrationRequest {
    RegistrationRequest {
        username: username.to_string(),
        email: email.to_string(),
        email_confirmation: email.to_string(),
        password: PASSWORD.to_string(),
        password_confirmation: PASSWORD.to_string(),
        mobile: mobile.to_string(),
        mobile_confirmation: mobile.to_string(),
    }
}

pub(super) fn personal_details() -> PersonalDetails {
    PersonalDetails {
        apar_name: Some("Meera Nair".to_string()),
        mother_name: "Lakshmi Nair".to_string(),
        guardian_relation: "Father".to_string(),
        guardian_name: "Suresh Nair".to_string(),
        category: "General".to_string(),
        citizenship_country: Some("India".to_string()),
        territory_area: "Urban".to_string(),
        minority: "No".to_string(),
        religion: "Hindu".to_string(),
        marital_status: "Single".to_string(),
        ..PersonalDetails::default()
    }
}

pub(super) fn programme_details() -> ProgrammeDetails {
    ProgrammeDetails {
        programme_type: "DIPLOMA".to_string(),
        mode_of_study: "Regular".to_string(),
        programme_enrollment: "DIPN".to_string(),
        region_code: "1".to_string(),
        study_center_code: "MC001".to_string(),
        medium: "English".to_string(),
    }
}

pub(super) fn qualification_request() -> QualificationRequest {
    QualificationRequest {
        qualifications: vec![QualificationInput {
            relevant_qualification: "Senior Secondary (10+2)".to_string(),
            main_subjects: Some("Physics, Chemistry, Biology".to_string()),
            year_of_passing: Some(2025),
            division: "First".to_string(),
            percent_marks: Some(82.5),
            board_code: "CBSE".to_string(),
            board_roll_number: Some("1203344".to_string()),
        }],
        nad_username: None,
        nad_certificate_id: None,
    }
}

pub(super) fn correspondence_details() -> CorrespondenceDetails {
    CorrespondenceDetails {
        address_line_1: "14 Lake View Road".to_string(),
        address_line_2: None,
        city: "Kochi".to_string(),
        pincode: "682001".to_string(),
        post_office: "Ernakulam".to_string(),
    }
}

pub(super) fn upload_request(document_type: &str) -> UploadRequest {
    UploadRequest {
        document_type: document_type.to_string(),
        storage_key: format!("uploads/{document_type}.jpg"),
        original_name: format!("{document_type}.jpg"),
        mime_type: Some("image/jpeg".to_string()),
        file_size: 150_000,
    }
}

pub(super) fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

pub(super) fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
