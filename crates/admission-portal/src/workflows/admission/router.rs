use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

use super::accounts::credentials::secrets_match;
use super::accounts::{AccountError, RegistrationRequest};
use super::domain::{ApplicantId, CorrespondenceDetails, PersonalDetails, ProgrammeDetails};
use super::payments::{BankTransferRequest, GatewayError, PaymentError};
use super::portal::AdmissionPortal;
use super::repository::RepositoryError;
use super::review::ReviewError;
use super::status::WorkflowError;
use super::uploads::{UploadError, UploadRequest};
use super::validation::ValidationErrors;
use super::wizard::{QualificationRequest, WizardError};
use crate::workflows::catalog::CatalogError;
use crate::workflows::forms::FormError;
use crate::workflows::money::Amount;

type PortalState = State<Arc<AdmissionPortal>>;

const DEFAULT_PENDING_LIMIT: usize = 50;

/// HTTP surface of the admission portal.
pub fn admission_router(portal: Arc<AdmissionPortal>) -> Router {
    Router::new()
        .route("/api/applicants/register", post(register_handler))
        .route("/api/applicants/login", post(login_handler))
        .route("/api/applicants/verify-otp", post(verify_otp_handler))
        .route("/api/applicants/password/otp", post(password_otp_handler))
        .route("/api/applicants/password/reset", post(password_reset_handler))
        .route("/api/applicants/username/reminder", post(username_reminder_handler))
        .route(
            "/api/applicants/registration/resend",
            post(resend_registration_handler),
        )
        .route("/api/applicants/me", get(me_handler))
        .route("/api/applicants/logout", post(logout_handler))
        .route(
            "/api/applicants/personal",
            get(personal_handler).post(save_personal_handler),
        )
        .route(
            "/api/applicants/programme",
            get(programme_handler).post(save_programme_handler),
        )
        .route(
            "/api/applicants/qualification",
            get(qualification_handler).post(save_qualification_handler),
        )
        .route(
            "/api/applicants/correspondence",
            get(correspondence_handler).post(save_correspondence_handler),
        )
        .route(
            "/api/applicants/uploads",
            get(uploads_handler).post(store_upload_handler),
        )
        .route(
            "/api/applicants/uploads/:document_type",
            delete(delete_upload_handler),
        )
        .route("/api/applicants/submit", post(submit_handler))
        .route("/api/applicants/fees", get(fees_handler))
        .route("/api/payments/gateways", get(gateways_handler))
        .route("/api/payments/bank-transfer", post(bank_transfer_handler))
        .route("/api/payments/cashfree/orders", post(create_order_handler))
        .route("/api/payments/cashfree/verify", post(verify_order_handler))
        .route("/api/payments/history", get(history_handler))
        .route("/api/catalog/branches", get(branches_handler))
        .route("/api/catalog/programme-types", get(programme_types_handler))
        .route("/api/catalog/programmes", get(programmes_handler))
        .route("/api/catalog/boards", get(boards_handler))
        .route("/api/catalog/post-offices/:pincode", get(post_offices_handler))
        .route(
            "/api/forms/:short_code",
            get(form_handler).post(submit_form_handler),
        )
        .route("/api/admin/applications", get(pending_handler))
        .route("/api/admin/applications/:applicant_id", get(application_handler))
        .route(
            "/api/admin/applications/:applicant_id/approve",
            post(approve_handler),
        )
        .route(
            "/api/admin/applications/:applicant_id/reject",
            post(reject_handler),
        )
        .route(
            "/api/admin/payments/:transaction_id/reconcile",
            post(reconcile_handler),
        )
        .with_state(portal)
}

/// Applicant resolved from `Authorization: Bearer <session token>`.
pub struct ApplicantSession {
    pub applicant_id: ApplicantId,
    token: String,
}

#[axum::async_trait]
impl FromRequestParts<Arc<AdmissionPortal>> for ApplicantSession {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        portal: &Arc<AdmissionPortal>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(unauthenticated)?;
        let applicant_id = portal
            .accounts
            .authenticate(token)
            .map_err(|_| unauthenticated())?;
        Ok(Self {
            applicant_id,
            token: token.to_string(),
        })
    }
}

/// Requires the configured administrator token.
pub struct AdminGuard;

#[axum::async_trait]
impl FromRequestParts<Arc<AdmissionPortal>> for AdminGuard {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        portal: &Arc<AdmissionPortal>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = portal.admin_token() else {
            return Err(error_body(
                StatusCode::FORBIDDEN,
                "Administration is not enabled on this portal.",
            ));
        };
        let token = bearer_token(parts).ok_or_else(unauthenticated)?;
        if !secrets_match(token, expected) {
            return Err(error_body(StatusCode::FORBIDDEN, "Forbidden."));
        }
        Ok(AdminGuard)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn unauthenticated() -> Response {
    error_body(StatusCode::UNAUTHORIZED, "Unauthenticated.")
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct VerifyOtpBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    otp: String,
}

#[derive(Debug, Deserialize)]
struct UsernameBody {
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct EmailBody {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct PasswordResetBody {
    #[serde(default)]
    username: String,
    #[serde(default)]
    otp: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password_confirmation: String,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct VerifyOrderBody {
    #[serde(default)]
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ReconcileBody {
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct PendingQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ProgrammeQuery {
    #[serde(default, rename = "type")]
    programme_type: String,
}

#[derive(Debug, Deserialize)]
struct BoardQuery {
    #[serde(default)]
    level: String,
}

async fn register_handler(
    State(portal): PortalState,
    Json(request): Json<RegistrationRequest>,
) -> Response {
    respond(
        portal.accounts.register(request),
        StatusCode::CREATED,
        account_failure,
    )
}

async fn login_handler(State(portal): PortalState, Json(body): Json<LoginBody>) -> Response {
    respond(
        portal.accounts.login(&body.username, &body.password),
        StatusCode::OK,
        account_failure,
    )
}

async fn verify_otp_handler(
    State(portal): PortalState,
    Json(body): Json<VerifyOtpBody>,
) -> Response {
    respond(
        portal.accounts.verify_otp(&body.email, &body.otp),
        StatusCode::OK,
        account_failure,
    )
}

async fn password_otp_handler(
    State(portal): PortalState,
    Json(body): Json<UsernameBody>,
) -> Response {
    respond(
        portal.accounts.request_password_reset(&body.username),
        StatusCode::OK,
        account_failure,
    )
}

async fn password_reset_handler(
    State(portal): PortalState,
    Json(body): Json<PasswordResetBody>,
) -> Response {
    let result = portal
        .accounts
        .reset_password(
            &body.username,
            &body.otp,
            &body.password,
            &body.password_confirmation,
        )
        .map(|()| json!({ "message": "Your password has been reset." }));
    respond(result, StatusCode::OK, account_failure)
}

async fn username_reminder_handler(
    State(portal): PortalState,
    Json(body): Json<EmailBody>,
) -> Response {
    let result = portal
        .accounts
        .request_username_reminder(&body.email)
        .map(|()| json!({ "message": "Your username has been sent to your email address." }));
    respond(result, StatusCode::OK, account_failure)
}

async fn resend_registration_handler(
    State(portal): PortalState,
    Json(body): Json<EmailBody>,
) -> Response {
    let result = portal
        .accounts
        .resend_registration_email(&body.email)
        .map(|()| json!({ "message": "The registration email has been sent again." }));
    respond(result, StatusCode::OK, account_failure)
}

async fn me_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.accounts.me(session.applicant_id),
        StatusCode::OK,
        account_failure,
    )
}

async fn logout_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    let logged_out = portal.accounts.logout(&session.token);
    (StatusCode::OK, Json(json!({ "logged_out": logged_out }))).into_response()
}

async fn personal_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.wizard.personal(session.applicant_id),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn save_personal_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(details): Json<PersonalDetails>,
) -> Response {
    respond(
        portal.wizard.save_personal(session.applicant_id, details),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn programme_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.wizard.programme(session.applicant_id),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn save_programme_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(details): Json<ProgrammeDetails>,
) -> Response {
    respond(
        portal.wizard.save_programme(session.applicant_id, details),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn qualification_handler(
    State(portal): PortalState,
    session: ApplicantSession,
) -> Response {
    respond(
        portal.wizard.qualification(session.applicant_id),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn save_qualification_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(request): Json<QualificationRequest>,
) -> Response {
    respond(
        portal.wizard.save_qualification(session.applicant_id, request),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn correspondence_handler(
    State(portal): PortalState,
    session: ApplicantSession,
) -> Response {
    respond(
        portal.wizard.correspondence(session.applicant_id),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn save_correspondence_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(details): Json<CorrespondenceDetails>,
) -> Response {
    respond(
        portal.wizard.save_correspondence(session.applicant_id, details),
        StatusCode::OK,
        wizard_failure,
    )
}

async fn uploads_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.uploads.list(session.applicant_id),
        StatusCode::OK,
        upload_failure,
    )
}

async fn store_upload_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(request): Json<UploadRequest>,
) -> Response {
    respond(
        portal.uploads.store(session.applicant_id, request).await,
        StatusCode::CREATED,
        upload_failure,
    )
}

async fn delete_upload_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Path(document_type): Path<String>,
) -> Response {
    respond(
        portal.uploads.delete(session.applicant_id, &document_type),
        StatusCode::OK,
        upload_failure,
    )
}

async fn submit_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.review.submit(session.applicant_id),
        StatusCode::OK,
        review_failure,
    )
}

async fn fees_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    let result = portal
        .payments
        .fee_schedule_for(session.applicant_id)
        .map(|schedule| {
            let total = schedule.as_ref().map(|schedule| schedule.total());
            json!({ "fee_schedule": schedule, "total": total })
        });
    respond(result, StatusCode::OK, payment_failure)
}

async fn gateways_handler(State(portal): PortalState, _session: ApplicantSession) -> Response {
    (StatusCode::OK, Json(portal.payments.active_gateways())).into_response()
}

async fn bank_transfer_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(request): Json<BankTransferRequest>,
) -> Response {
    respond(
        portal
            .payments
            .submit_bank_transfer(session.applicant_id, request),
        StatusCode::CREATED,
        payment_failure,
    )
}

async fn create_order_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(body): Json<OrderBody>,
) -> Response {
    respond(
        portal
            .payments
            .create_gateway_order(session.applicant_id, body.amount)
            .await,
        StatusCode::OK,
        payment_failure,
    )
}

async fn verify_order_handler(
    State(portal): PortalState,
    session: ApplicantSession,
    Json(body): Json<VerifyOrderBody>,
) -> Response {
    respond(
        portal
            .payments
            .verify_gateway_order(session.applicant_id, &body.order_id)
            .await,
        StatusCode::OK,
        payment_failure,
    )
}

async fn history_handler(State(portal): PortalState, session: ApplicantSession) -> Response {
    respond(
        portal.payments.history(session.applicant_id),
        StatusCode::OK,
        payment_failure,
    )
}

async fn branches_handler(State(portal): PortalState) -> Response {
    (StatusCode::OK, Json(portal.catalog.branches())).into_response()
}

async fn programme_types_handler(State(portal): PortalState) -> Response {
    (StatusCode::OK, Json(portal.catalog.programme_types())).into_response()
}

async fn programmes_handler(
    State(portal): PortalState,
    Query(query): Query<ProgrammeQuery>,
) -> Response {
    let programmes = portal.catalog.programmes(query.programme_type.trim());
    (StatusCode::OK, Json(programmes)).into_response()
}

async fn boards_handler(State(portal): PortalState, Query(query): Query<BoardQuery>) -> Response {
    let boards = portal.catalog.boards(query.level.trim());
    (StatusCode::OK, Json(boards)).into_response()
}

async fn post_offices_handler(
    State(portal): PortalState,
    Path(pincode): Path<String>,
) -> Response {
    match portal.catalog.post_offices(&pincode) {
        Ok(offices) => (StatusCode::OK, Json(offices)).into_response(),
        Err(err @ CatalogError::InvalidPincode(_)) => {
            validation_failed(ValidationErrors::single("pincode", err.to_string()))
        }
    }
}

async fn form_handler(State(portal): PortalState, Path(short_code): Path<String>) -> Response {
    respond(portal.forms.form(&short_code), StatusCode::OK, form_failure)
}

async fn submit_form_handler(
    State(portal): PortalState,
    Path(short_code): Path<String>,
    Json(mut payload): Json<Map<String, Value>>,
) -> Response {
    payload.remove("_token");
    respond(
        portal.forms.submit(&short_code, payload),
        StatusCode::OK,
        form_failure,
    )
}

async fn pending_handler(
    State(portal): PortalState,
    _admin: AdminGuard,
    Query(query): Query<PendingQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    respond(portal.review.pending(limit), StatusCode::OK, review_failure)
}

async fn application_handler(
    State(portal): PortalState,
    _admin: AdminGuard,
    Path(applicant_id): Path<u64>,
) -> Response {
    respond(
        portal.review.application(ApplicantId(applicant_id)),
        StatusCode::OK,
        review_failure,
    )
}

async fn approve_handler(
    State(portal): PortalState,
    _admin: AdminGuard,
    Path(applicant_id): Path<u64>,
) -> Response {
    respond(
        portal.review.approve(ApplicantId(applicant_id)),
        StatusCode::OK,
        review_failure,
    )
}

async fn reject_handler(
    State(portal): PortalState,
    _admin: AdminGuard,
    Path(applicant_id): Path<u64>,
    Json(body): Json<RejectBody>,
) -> Response {
    respond(
        portal.review.reject(ApplicantId(applicant_id), &body.reason),
        StatusCode::OK,
        review_failure,
    )
}

async fn reconcile_handler(
    State(portal): PortalState,
    _admin: AdminGuard,
    Path(transaction_id): Path<String>,
    Json(body): Json<ReconcileBody>,
) -> Response {
    respond(
        portal
            .payments
            .reconcile_bank_transfer(&transaction_id, body.verified),
        StatusCode::OK,
        payment_failure,
    )
}

fn respond<T, E>(result: Result<T, E>, success: StatusCode, failure: fn(E) -> Response) -> Response
where
    T: Serialize,
{
    match result {
        Ok(value) => (success, Json(value)).into_response(),
        Err(err) => failure(err),
    }
}

fn error_body(status: StatusCode, message: impl Display) -> Response {
    let payload = json!({
        "error": message.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn validation_failed(errors: ValidationErrors) -> Response {
    let payload = json!({
        "success": false,
        "errors": errors,
    });
    (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
}

fn workflow_failed(err: WorkflowError) -> Response {
    match &err {
        WorkflowError::Locked { .. } | WorkflowError::PaymentNotAllowed { .. } => {
            error_body(StatusCode::FORBIDDEN, err)
        }
        WorkflowError::InvalidTransition { .. } => error_body(StatusCode::CONFLICT, err),
        WorkflowError::Incomplete { missing } => {
            let payload = json!({
                "error": err.to_string(),
                "missing": missing,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        WorkflowError::MissingReason => {
            validation_failed(ValidationErrors::single("reason", err.to_string()))
        }
    }
}

fn repository_failed(err: RepositoryError) -> Response {
    match err {
        RepositoryError::NotFound => error_body(StatusCode::NOT_FOUND, "Record not found."),
        RepositoryError::Conflict => error_body(StatusCode::CONFLICT, "Record already exists."),
        RepositoryError::Unavailable(_) => {
            error!(error = %err, "admission storage unavailable");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

fn account_failure(err: AccountError) -> Response {
    match err {
        AccountError::Validation(errors) => validation_failed(errors),
        AccountError::Unauthenticated => unauthenticated(),
        AccountError::Repository(err) => repository_failed(err),
    }
}

fn wizard_failure(err: WizardError) -> Response {
    match err {
        WizardError::Validation(errors) => validation_failed(errors),
        WizardError::Workflow(err) => workflow_failed(err),
        WizardError::Repository(err) => repository_failed(err),
    }
}

fn upload_failure(err: UploadError) -> Response {
    match err {
        UploadError::Validation(errors) => validation_failed(errors),
        UploadError::Workflow(err) => workflow_failed(err),
        UploadError::NotFound(_) => error_body(StatusCode::NOT_FOUND, err),
        UploadError::Verifier(ref source) => {
            error!(error = %source, "image verifier failed");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
        UploadError::Repository(err) => repository_failed(err),
    }
}

fn review_failure(err: ReviewError) -> Response {
    match err {
        ReviewError::Workflow(err) => workflow_failed(err),
        ReviewError::NotFound(_) => error_body(StatusCode::NOT_FOUND, err),
        ReviewError::Repository(err) => repository_failed(err),
    }
}

fn form_failure(err: FormError) -> Response {
    match err {
        FormError::NotFound => error_body(StatusCode::NOT_FOUND, err),
        FormError::Closed => error_body(StatusCode::FORBIDDEN, err),
        FormError::Validation(errors) => validation_failed(errors),
        FormError::Repository(err) => repository_failed(err),
    }
}

fn payment_failure(err: PaymentError) -> Response {
    match err {
        PaymentError::Validation(errors) => validation_failed(errors),
        PaymentError::Workflow(err) => workflow_failed(err),
        PaymentError::Gateway(GatewayError::Rejected { message, .. }) => {
            error_body(StatusCode::BAD_GATEWAY, message)
        }
        PaymentError::Gateway(err) => error_body(StatusCode::BAD_GATEWAY, err),
        PaymentError::Repository(RepositoryError::Conflict) => error_body(
            StatusCode::CONFLICT,
            "A payment with this transaction id was already recorded.",
        ),
        PaymentError::Repository(err) => repository_failed(err),
        PaymentError::NotConfigured => error_body(StatusCode::SERVICE_UNAVAILABLE, err),
        PaymentError::MissingOrderId => error_body(StatusCode::BAD_REQUEST, err),
        PaymentError::OrderNotOwned => error_body(StatusCode::FORBIDDEN, err),
        PaymentError::AlreadySettled(_) => error_body(StatusCode::CONFLICT, err),
    }
}
