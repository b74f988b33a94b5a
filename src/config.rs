use std::env;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::AppError;
use crate::recurrence::DEFAULT_HORIZON_DAYS;

const DEFAULT_DATABASE_URL: &str = "sqlite://letitout.db";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_ALLOWED_HEADERS: &str =
    "content-type,authorization,x-requested-with,accept,origin,x-user-id,x-timezone";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub horizon_days: u32,
    pub cors: CorsConfig,
}

/// Cross-origin policy. `*` in `allowed_origins` allows any origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    pub allowed_headers: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let horizon_days = match env::var("HORIZON_DAYS") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .map_err(|e| AppError::Config(format!("HORIZON_DAYS is invalid: {}", e)))?,
            Err(_) => DEFAULT_HORIZON_DAYS,
        };

        let allow_credentials = match env::var("CORS_ALLOW_CREDENTIALS") {
            Ok(value) => parse_bool(&value).ok_or_else(|| {
                AppError::Config(format!("CORS_ALLOW_CREDENTIALS is invalid: {}", value))
            })?,
            Err(_) => true,
        };

        let cors = CorsConfig {
            allowed_origins: split_list(
                &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
            allow_credentials,
            allowed_headers: split_list(
                &env::var("CORS_ALLOWED_HEADERS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_HEADERS.to_string()),
            ),
        };

        Ok(Self {
            database_url,
            bind_addr,
            horizon_days,
            cors,
        })
    }
}

impl CorsConfig {
    pub fn layer(&self) -> CorsLayer {
        let any_origin = self.allowed_origins.iter().any(|origin| origin == "*");

        let origin = if any_origin && self.allow_credentials {
            // Credentials forbid a literal `*`; echo the caller's origin instead.
            AllowOrigin::mirror_request()
        } else if any_origin {
            AllowOrigin::any()
        } else {
            let mut parsed = Vec::new();
            for origin in &self.allowed_origins {
                match HeaderValue::from_str(origin) {
                    Ok(value) => parsed.push(value),
                    Err(err) => warn!("ignoring invalid CORS origin '{origin}': {err}"),
                }
            }
            AllowOrigin::list(parsed)
        };

        let mut headers = Vec::new();
        for header in &self.allowed_headers {
            match HeaderName::from_bytes(header.as_bytes()) {
                Ok(name) => headers.push(name),
                Err(err) => warn!("ignoring invalid CORS header '{header}': {err}"),
            }
        }

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(AllowHeaders::list(headers))
            .allow_credentials(self.allow_credentials)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
