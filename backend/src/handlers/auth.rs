//! HTTP handlers for admin authentication

use std::time::Duration;

use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::enforce_rate_limit;
use crate::middleware::CurrentAdmin;
use crate::services::auth::{AdminAuthService, AuthTokens, CreateAdminInput, LoginInput, LoginResponse};
use crate::AppState;

/// Request body for token refresh
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response after provisioning an admin user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminResponse {
    pub success: bool,
    pub admin_id: Uuid,
}

/// Authenticate an admin
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<LoginResponse>> {
    enforce_rate_limit(&state, &headers, "login", 5, Duration::from_secs(60))?;

    let service = AdminAuthService::new(state.db.clone(), &state.config);
    let response = service.login(input).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair
/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthTokens>> {
    enforce_rate_limit(&state, &headers, "refresh", 10, Duration::from_secs(60))?;

    let service = AdminAuthService::new(state.db.clone(), &state.config);
    let tokens = service.refresh(&input.refresh_token).await?;
    Ok(Json(tokens))
}

/// Provision a new admin user (org_admin only)
/// POST /auth/admins
pub async fn create_admin(
    State(state): State<AppState>,
    current_admin: CurrentAdmin,
    Json(input): Json<CreateAdminInput>,
) -> AppResult<Json<CreateAdminResponse>> {
    let service = AdminAuthService::new(state.db.clone(), &state.config);
    let admin_id = service.create_admin(&current_admin.0, input).await?;
    Ok(Json(CreateAdminResponse {
        success: true,
        admin_id,
    }))
}
