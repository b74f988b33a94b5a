use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::AppError;
use crate::temporal::{resolve_timezone, today_in};

pub const OWNER_HEADER: &str = "x-user-id";
pub const TIMEZONE_HEADER: &str = "x-timezone";

/// Id of the user the request acts for. Authentication happens upstream.
#[derive(Debug, Clone)]
pub struct Owner(pub String);

/// The caller's IANA zone, used for naive dates and for "today".
#[derive(Debug, Clone)]
pub struct RequestZone {
    pub name: String,
    pub tz: Tz,
}

impl RequestZone {
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        today_in(self.tz, now)
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header_value(parts, OWNER_HEADER)
            .map(Owner)
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for RequestZone
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = header_value(parts, TIMEZONE_HEADER).ok_or_else(|| {
            AppError::BadRequest("X-Timezone header is required".to_string())
        })?;
        let tz = resolve_timezone(&name);
        Ok(Self { name, tz })
    }
}
