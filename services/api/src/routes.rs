use crate::infra::AppState;
use admission_portal::workflows::admission::{admission_router, AdmissionPortal};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_portal_routes(portal: Arc<AdmissionPortal>) -> axum::Router {
    admission_router(portal)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemoryApplicantRepository, InMemoryRegistrationLedger, OutboxMailer};
    use admission_portal::config::PortalConfig;
    use admission_portal::workflows::admission::{PortalDependencies, SystemClock};
    use admission_portal::workflows::catalog::InMemoryCatalog;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn portal() -> Arc<AdmissionPortal> {
        let dependencies = PortalDependencies {
            applicants: Arc::new(InMemoryApplicantRepository::default()),
            ledger: Arc::new(InMemoryRegistrationLedger::default()),
            mailer: Arc::new(OutboxMailer::default()),
            clock: Arc::new(SystemClock),
            catalog: Arc::new(InMemoryCatalog::seeded()),
        };
        Arc::new(AdmissionPortal::builder(dependencies, PortalConfig::default()).build())
    }

    fn app(ready: bool) -> axum::Router {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        };
        with_portal_routes(portal()).layer(Extension(state))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (status, body) = get(app(false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (status, body) = get(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["status"], "initializing");

        let state_flag = Arc::new(AtomicBool::new(false));
        let recorder = PrometheusBuilder::new().build_recorder();
        let router = with_portal_routes(portal()).layer(Extension(AppState {
            readiness: state_flag.clone(),
            metrics: Arc::new(recorder.handle()),
        }));
        state_flag.store(true, Ordering::Release);
        let (status, _) = get(router, "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn portal_routes_are_mounted_next_to_ops_routes() {
        let (status, body) = get(app(true), "/api/catalog/programme-types").await;
        assert_eq!(status, StatusCode::OK);
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert!(payload.as_array().is_some_and(|types| !types.is_empty()));

        let (status, _) = get(app(true), "/api/applicants/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
