//! One-time link tokens binding actors to LINE identities
//!
//! Issuance overwrites any prior unclaimed token for the actor and stamps a
//! 24-hour expiry. The claim is a single conditional UPDATE — `WHERE token
//! matches AND line_user_id IS NULL` — so two concurrent claims of the same
//! token resolve to exactly one winner at the storage layer, with no
//! read-then-write race and no application-level lock.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Tokens are valid for 24 hours after issuance, drivers and admins alike.
const TOKEN_TTL_HOURS: i64 = 24;

/// Link-token issuance and claiming for drivers and admin users
#[derive(Clone)]
pub struct LinkTokenService {
    db: PgPool,
}

/// The actor a successful claim bound
#[derive(Debug, Clone)]
pub struct LinkedActor {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
}

impl LinkTokenService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Issuance
    // ========================================================================

    /// Issue a registration token for a driver, replacing any unclaimed one.
    pub async fn issue_driver_token(
        &self,
        organization_id: Uuid,
        driver_id: Uuid,
    ) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);

        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET registration_token = $3,
                registration_token_expires_at = $4,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .bind(&token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Driver".to_string()));
        }

        Ok(token)
    }

    /// Issue a LINE link token for an admin user, replacing any unclaimed one.
    pub async fn issue_admin_token(
        &self,
        organization_id: Uuid,
        admin_id: Uuid,
    ) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);

        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET line_registration_token = $3,
                line_registration_token_expires_at = $4,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(admin_id)
        .bind(organization_id)
        .bind(&token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Admin user".to_string()));
        }

        Ok(token)
    }

    // ========================================================================
    // Claiming
    // ========================================================================

    /// Claim a driver registration token for a verified LINE user id.
    pub async fn claim_driver_token(
        &self,
        token: &str,
        line_user_id: &str,
    ) -> AppResult<LinkedActor> {
        let candidate = sqlx::query_as::<_, (Uuid, String, Uuid, Option<DateTime<Utc>>)>(
            r#"
            SELECT id, name, organization_id, registration_token_expires_at
            FROM drivers
            WHERE registration_token = $1 AND line_user_id IS NULL
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::LinkTokenNotFound)?;

        let (driver_id, name, organization_id, expires_at) = candidate;

        if is_expired(expires_at, Utc::now()) {
            // Null the stale token so the expired value cannot be replayed
            sqlx::query(
                r#"
                UPDATE drivers
                SET registration_token = NULL,
                    registration_token_expires_at = NULL,
                    updated_at = NOW()
                WHERE id = $1 AND registration_token = $2
                "#,
            )
            .bind(driver_id)
            .bind(token)
            .execute(&self.db)
            .await?;
            return Err(AppError::LinkTokenExpired);
        }

        // The candidate row is unbound, so any existing binding of this LINE
        // account belongs to a different driver.
        let already_bound =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM drivers WHERE line_user_id = $1")
                .bind(line_user_id)
                .fetch_optional(&self.db)
                .await?;
        if already_bound.is_some() {
            return Err(AppError::LineAccountAlreadyLinked);
        }

        // Atomic claim: zero rows affected means a concurrent claim won.
        let claimed = sqlx::query(
            r#"
            UPDATE drivers
            SET line_user_id = $2,
                registration_token = NULL,
                registration_token_expires_at = NULL,
                updated_at = NOW()
            WHERE registration_token = $1 AND line_user_id IS NULL
            "#,
        )
        .bind(token)
        .bind(line_user_id)
        .execute(&self.db)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(AppError::LinkTokenAlreadyUsed);
        }

        Ok(LinkedActor {
            id: driver_id,
            name,
            organization_id,
        })
    }

    /// Claim an admin LINE link token for a verified LINE user id.
    ///
    /// Same protocol as the driver claim, against `admin_users`. The webhook
    /// treats `LinkTokenNotFound` as "not an admin token" and falls through.
    pub async fn claim_admin_token(
        &self,
        token: &str,
        line_user_id: &str,
    ) -> AppResult<LinkedActor> {
        let candidate = sqlx::query_as::<_, (Uuid, String, Uuid, Option<DateTime<Utc>>)>(
            r#"
            SELECT id, name, organization_id, line_registration_token_expires_at
            FROM admin_users
            WHERE line_registration_token = $1 AND line_user_id IS NULL
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::LinkTokenNotFound)?;

        let (admin_id, name, organization_id, expires_at) = candidate;

        if is_expired(expires_at, Utc::now()) {
            sqlx::query(
                r#"
                UPDATE admin_users
                SET line_registration_token = NULL,
                    line_registration_token_expires_at = NULL,
                    updated_at = NOW()
                WHERE id = $1 AND line_registration_token = $2
                "#,
            )
            .bind(admin_id)
            .bind(token)
            .execute(&self.db)
            .await?;
            return Err(AppError::LinkTokenExpired);
        }

        let already_bound =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM admin_users WHERE line_user_id = $1")
                .bind(line_user_id)
                .fetch_optional(&self.db)
                .await?;
        if already_bound.is_some() {
            return Err(AppError::LineAccountAlreadyLinked);
        }

        let claimed = sqlx::query(
            r#"
            UPDATE admin_users
            SET line_user_id = $2,
                line_registration_token = NULL,
                line_registration_token_expires_at = NULL,
                updated_at = NOW()
            WHERE line_registration_token = $1 AND line_user_id IS NULL
            "#,
        )
        .bind(token)
        .bind(line_user_id)
        .execute(&self.db)
        .await?;

        if claimed.rows_affected() == 0 {
            return Err(AppError::LinkTokenAlreadyUsed);
        }

        Ok(LinkedActor {
            id: admin_id,
            name,
            organization_id,
        })
    }

    // ========================================================================
    // Unlinking
    // ========================================================================

    /// Remove a driver's LINE binding and any outstanding token.
    pub async fn unlink_driver(&self, organization_id: Uuid, driver_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET line_user_id = NULL,
                registration_token = NULL,
                registration_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(driver_id)
        .bind(organization_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Driver".to_string()));
        }

        Ok(())
    }

    /// Remove an admin user's LINE binding and any outstanding token.
    pub async fn unlink_admin(&self, organization_id: Uuid, admin_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE admin_users
            SET line_user_id = NULL,
                line_registration_token = NULL,
                line_registration_token_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(admin_id)
        .bind(organization_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Admin user".to_string()));
        }

        Ok(())
    }
}

/// A token without a stamped expiry never expires; one with a stamp expires
/// the moment the stamp passes.
fn is_expired(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(expires_at) => expires_at < now,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        assert!(!is_expired(None, now));
        assert!(!is_expired(Some(now + Duration::hours(1)), now));
        assert!(is_expired(Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn test_issued_tokens_are_unique() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
