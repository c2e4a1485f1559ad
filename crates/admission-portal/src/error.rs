use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::admission::payments::GatewayError;
use crate::workflows::catalog::PostOfficeImportError;

/// Failures that stop the admission service from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("post office directory {}: {source}", .path.display())]
    PostOffices {
        path: PathBuf,
        #[source]
        source: PostOfficeImportError,
    },
    #[error("payment gateway client: {0}")]
    PaymentGateway(#[from] GatewayError),
    #[error("cannot listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("admission portal stopped serving: {0}")]
    Serve(#[source] std::io::Error),
}

impl AppError {
    /// Attaches the CSV path to an import failure.
    pub fn post_offices(path: &Path) -> impl FnOnce(PostOfficeImportError) -> Self + '_ {
        move |source| AppError::PostOffices {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::PostOffices { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Listen { .. }
            | AppError::Serve(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
