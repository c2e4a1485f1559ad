use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryApplicantRepository, InMemoryRegistrationLedger, OutboxMailer};
use crate::routes::with_portal_routes;
use admission_portal::config::AppConfig;
use admission_portal::error::AppError;
use admission_portal::telemetry;
use admission_portal::workflows::admission::{
    AdmissionPortal, CashfreeClient, CommandImageVerifier, PortalDependencies, SystemClock,
};
use admission_portal::workflows::catalog::{InMemoryCatalog, PostOfficeImporter};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mut catalog = InMemoryCatalog::seeded();
    if let Some(path) = &config.portal.post_office_csv {
        let offices = PostOfficeImporter::from_path(path).map_err(AppError::post_offices(path))?;
        info!(count = offices.len(), path = %path.display(), "post office directory loaded");
        catalog = catalog.with_post_offices(offices);
    }

    let dependencies = PortalDependencies {
        applicants: Arc::new(InMemoryApplicantRepository::default()),
        ledger: Arc::new(InMemoryRegistrationLedger::default()),
        mailer: Arc::new(OutboxMailer::default()),
        clock: Arc::new(SystemClock),
        catalog: Arc::new(catalog),
    };

    let mut builder = AdmissionPortal::builder(dependencies, config.portal.clone())
        .bank_transfer(config.bank_transfer.clone());
    match config.cashfree.credentials() {
        Some(credentials) => {
            info!(mode = credentials.mode.sdk_mode(), "cashfree gateway enabled");
            builder = builder.gateway(Arc::new(CashfreeClient::new(credentials)?));
        }
        None => warn!("cashfree credentials missing; online payment disabled"),
    }
    if let Some(verifier) = config
        .portal
        .image_verifier_cmd
        .as_deref()
        .and_then(CommandImageVerifier::from_command_line)
    {
        builder = builder.verifier(Arc::new(verifier));
    }
    if config.portal.admin_token.is_none() {
        warn!("ADMISSION_ADMIN_TOKEN unset; admin review routes will refuse every request");
    }

    let app = with_portal_routes(Arc::new(builder.build()))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Listen { addr, source })?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission portal ready");

    axum::serve(listener, app).await.map_err(AppError::Serve)
}
