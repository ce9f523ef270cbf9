//! LINE identity verification and actor resolution
//!
//! The LIFF app authenticates with a LINE-issued ID token. The token is
//! verified against LINE's verify endpoint with the configured channel id;
//! the `sub` claim is the LINE user id, which is then resolved to the active
//! driver bound to it.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{Driver, DriverStatus};

/// Resolves verified LINE identities to internal actors
#[derive(Clone)]
pub struct IdentityService {
    db: PgPool,
    channel_id: Option<String>,
    http_client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct VerifyTokenResponse {
    sub: Option<String>,
}

impl IdentityService {
    pub fn new(db: PgPool, channel_id: Option<String>) -> Self {
        Self {
            db,
            channel_id,
            http_client: reqwest::Client::new(),
        }
    }

    /// Verify a LINE ID token and return the LINE user id (`sub`).
    ///
    /// Fails closed when no channel id is configured: without it no token
    /// can be verified, so no request may be trusted.
    pub async fn verify_id_token(&self, id_token: &str) -> AppResult<String> {
        let channel_id = self
            .channel_id
            .as_deref()
            .ok_or_else(|| AppError::Configuration("LINE channel id is not set".to_string()))?;

        let response = self
            .http_client
            .post("https://api.line.me/oauth2/v2.1/verify")
            .form(&[("id_token", id_token), ("client_id", channel_id)])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("LINE verify error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Unauthorized {
                message: "LINE authentication failed".to_string(),
                message_ja: "LINE認証に失敗しました".to_string(),
            });
        }

        let verified: VerifyTokenResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse LINE verify response: {}", e))
        })?;

        verified.sub.ok_or_else(|| AppError::Unauthorized {
            message: "LINE authentication failed".to_string(),
            message_ja: "LINE認証に失敗しました".to_string(),
        })
    }

    /// Resolve the active driver bound to a LINE user id.
    ///
    /// Suspended and retired drivers do not resolve; an unbound identity is
    /// a distinct error so the LIFF app can route to the registration page.
    pub async fn resolve_driver(&self, line_user_id: &str) -> AppResult<Driver> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, Option<Uuid>)>(
            r#"
            SELECT id, organization_id, name, default_vehicle_id
            FROM drivers
            WHERE line_user_id = $1 AND status = $2
            "#,
        )
        .bind(line_user_id)
        .bind(DriverStatus::Active.as_str())
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some((id, organization_id, name, default_vehicle_id)) => Ok(Driver {
                id,
                organization_id,
                name,
                default_vehicle_id,
            }),
            None => Err(AppError::NotRegistered),
        }
    }

    /// Verify an ID token and resolve the bound driver in one step
    pub async fn authenticate_driver(&self, id_token: &str) -> AppResult<Driver> {
        let line_user_id = self.verify_id_token(id_token).await?;
        self.resolve_driver(&line_user_id).await
    }
}
