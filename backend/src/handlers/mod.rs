//! HTTP handlers for the Fleet Safety Management Platform

pub mod auth;
pub mod dispatch;
pub mod health;
pub mod line_webhook;
pub mod link;
pub mod linking;
pub mod notification_settings;
pub mod reports;
pub mod shifts;

pub use auth::*;
pub use dispatch::*;
pub use health::*;
pub use line_webhook::*;
pub use link::*;
pub use linking::*;
pub use notification_settings::*;
pub use reports::*;
pub use shifts::*;

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::{AppError, AppResult};
use crate::services::rate_limit::client_ip;
use crate::AppState;

/// Extract the bearer token from the Authorization header, or reject with
/// 401 — a missing credential is an authentication failure, not a malformed
/// request.
pub(crate) fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized {
            message: "Authentication required".to_string(),
            message_ja: "認証が必要です".to_string(),
        })
}

/// Check the shared per-IP rate limit for a public endpoint.
pub(crate) fn enforce_rate_limit(
    state: &AppState,
    headers: &HeaderMap,
    scope: &str,
    max_requests: u32,
    window: Duration,
) -> AppResult<()> {
    let ip = client_ip(headers);
    let decision = state
        .rate_limiter
        .check(&format!("ip:{}:{}", scope, ip), max_requests, window);

    if !decision.allowed {
        let retry_after_secs = (decision.retry_after.as_millis() as u64).div_ceil(1000).max(1);
        return Err(AppError::RateLimited { retry_after_secs });
    }

    Ok(())
}
