use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::Serialize;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the admission service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub portal: PortalConfig,
    pub cashfree: CashfreeConfig,
    pub bank_transfer: Option<BankTransferDetails>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("ADMISSION_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match non_empty_var("ADMISSION_LOG_FORMAT") {
            Some(value) => LogFormat::parse(&value)?,
            None => LogFormat::Compact,
        };

        let portal = PortalConfig {
            public_base_url: env::var("ADMISSION_PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://{host}:{port}")),
            admin_token: non_empty_var("ADMISSION_ADMIN_TOKEN"),
            otp_ttl_minutes: parse_var("ADMISSION_OTP_TTL_MINUTES", DEFAULT_OTP_TTL_MINUTES)?,
            session_ttl_minutes: parse_var(
                "ADMISSION_SESSION_TTL_MINUTES",
                DEFAULT_SESSION_TTL_MINUTES,
            )?,
            max_upload_bytes: parse_var("ADMISSION_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            image_verifier_cmd: non_empty_var("ADMISSION_IMAGE_VERIFIER_CMD"),
            post_office_csv: non_empty_var("ADMISSION_POST_OFFICE_CSV").map(PathBuf::from),
        };

        let cashfree = CashfreeConfig {
            mode: match non_empty_var("CASHFREE_MODE") {
                Some(value) => CashfreeMode::parse(&value)?,
                None => CashfreeMode::Test,
            },
            test_app_id: non_empty_var("CASHFREE_TEST_APP_ID"),
            test_secret_key: non_empty_var("CASHFREE_TEST_SECRET_KEY"),
            live_app_id: non_empty_var("CASHFREE_LIVE_APP_ID"),
            live_secret_key: non_empty_var("CASHFREE_LIVE_SECRET_KEY"),
        };

        let bank_transfer =
            non_empty_var("BANK_TRANSFER_ACCOUNT_NUMBER").map(|account_number| {
                BankTransferDetails {
                    account_name: env::var("BANK_TRANSFER_ACCOUNT_NAME").unwrap_or_default(),
                    account_number,
                    ifsc: env::var("BANK_TRANSFER_IFSC").unwrap_or_default(),
                    bank_name: env::var("BANK_TRANSFER_BANK_NAME").unwrap_or_default(),
                }
            });

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            portal,
            cashfree,
            bank_transfer,
        })
    }
}

pub const DEFAULT_OTP_TTL_MINUTES: i64 = 15;
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 120;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Layout of log lines: one compact line per event, or the full
/// multi-line layout for local debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Knobs for the applicant-facing workflow.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Base URL used for login links and gateway return URLs.
    pub public_base_url: String,
    /// Bearer token guarding the admin review routes. Admin routes reject
    /// every request when unset.
    pub admin_token: Option<String>,
    pub otp_ttl_minutes: i64,
    /// Lifetime of an applicant bearer token.
    pub session_ttl_minutes: i64,
    pub max_upload_bytes: u64,
    pub image_verifier_cmd: Option<String>,
    pub post_office_csv: Option<PathBuf>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://127.0.0.1:3000".to_string(),
            admin_token: None,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            image_verifier_cmd: None,
            post_office_csv: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashfreeMode {
    Test,
    Live,
}

impl CashfreeMode {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "test" | "sandbox" => Ok(Self::Test),
            "live" | "production" => Ok(Self::Live),
            _ => Err(ConfigError::InvalidCashfreeMode(value.to_string())),
        }
    }

    /// Mode label reported to the browser checkout SDK.
    pub const fn sdk_mode(self) -> &'static str {
        match self {
            CashfreeMode::Test => "sandbox",
            CashfreeMode::Live => "production",
        }
    }

    pub const fn base_url(self) -> &'static str {
        match self {
            CashfreeMode::Test => "https://sandbox.cashfree.com/pg",
            CashfreeMode::Live => "https://api.cashfree.com/pg",
        }
    }
}

/// Gateway credentials for both environments; only the active mode is used.
#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub mode: CashfreeMode,
    pub test_app_id: Option<String>,
    pub test_secret_key: Option<String>,
    pub live_app_id: Option<String>,
    pub live_secret_key: Option<String>,
}

impl CashfreeConfig {
    pub fn credentials(&self) -> Option<CashfreeCredentials> {
        let (app_id, secret_key) = match self.mode {
            CashfreeMode::Test => (self.test_app_id.as_ref(), self.test_secret_key.as_ref()),
            CashfreeMode::Live => (self.live_app_id.as_ref(), self.live_secret_key.as_ref()),
        };

        Some(CashfreeCredentials {
            mode: self.mode,
            app_id: app_id?.clone(),
            secret_key: secret_key?.clone(),
        })
    }
}

#[derive(Clone)]
pub struct CashfreeCredentials {
    pub mode: CashfreeMode,
    pub app_id: String,
    pub secret_key: String,
}

impl fmt::Debug for CashfreeCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CashfreeCredentials")
            .field("mode", &self.mode)
            .field("app_id", &self.app_id)
            .field("secret_key", &"***")
            .finish()
    }
}

/// College account shown to applicants paying by bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankTransferDetails {
    pub account_name: String,
    pub account_number: String,
    pub ifsc: String,
    pub bank_name: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidCashfreeMode(String),
    InvalidLogFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got '{value}'")
            }
            ConfigError::InvalidCashfreeMode(value) => {
                write!(f, "CASHFREE_MODE must be 'test' or 'live', got '{value}'")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "ADMISSION_LOG_FORMAT must be 'compact' or 'pretty', got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidCashfreeMode(_)
            | ConfigError::InvalidLogFormat(_) => None,
        }
    }
}
