//! Admin authentication: login, token refresh, and staff provisioning

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthAdmin;
use shared::AdminRole;

/// Admin authentication service
#[derive(Clone)]
pub struct AdminAuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub organization_id: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Login input
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Input for provisioning a new admin user (org_admin only)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminInput {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: AdminRole,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response after a successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub admin_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub role: AdminRole,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

impl AdminAuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Authenticate an admin by email and password.
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginResponse> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String, String, String)>(
            r#"
            SELECT id, organization_id, password_hash, name, role
            FROM admin_users
            WHERE email = $1
            "#,
        )
        .bind(&input.email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let (admin_id, organization_id, password_hash, name, role) = row;

        let password_ok = verify(&input.password, &password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !password_ok {
            return Err(AppError::InvalidCredentials);
        }

        let role = AdminRole::parse(&role)
            .ok_or_else(|| AppError::Internal(format!("unknown admin role '{}'", role)))?;

        let tokens = self.issue_tokens(admin_id, organization_id, role)?;

        Ok(LoginResponse {
            admin_id,
            organization_id,
            name,
            role,
            tokens,
        })
    }

    /// Exchange a valid refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let claims = self.decode_token(refresh_token)?;

        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        let organization_id =
            Uuid::parse_str(&claims.organization_id).map_err(|_| AppError::InvalidToken)?;
        let role = AdminRole::parse(&claims.role).ok_or(AppError::InvalidToken)?;

        // The account must still exist; deleted admins cannot refresh.
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM admin_users WHERE id = $1 AND organization_id = $2",
        )
        .bind(admin_id)
        .bind(organization_id)
        .fetch_one(&self.db)
        .await?;
        if exists == 0 {
            return Err(AppError::InvalidToken);
        }

        self.issue_tokens(admin_id, organization_id, role)
    }

    /// Provision a new admin user. Only `org_admin` callers may do this, and
    /// the new account always lands in the caller's organization.
    pub async fn create_admin(
        &self,
        caller: &AuthAdmin,
        input: CreateAdminInput,
    ) -> AppResult<Uuid> {
        if caller.role != AdminRole::OrgAdmin {
            return Err(AppError::Forbidden {
                message: "org_admin role is required for this operation".to_string(),
                message_ja: "この操作にはorg_admin権限が必要です".to_string(),
            });
        }

        if !input.email.contains('@') {
            return Err(AppError::Validation {
                field: "email".to_string(),
                message: "A valid email address is required".to_string(),
                message_ja: "有効なメールアドレスを入力してください".to_string(),
            });
        }
        if input.password.len() < 8 {
            return Err(AppError::Validation {
                field: "password".to_string(),
                message: "Password must be at least 8 characters".to_string(),
                message_ja: "パスワードは8文字以上で入力してください".to_string(),
            });
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name is required".to_string(),
                message_ja: "氏名は必須です".to_string(),
            });
        }

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_users WHERE email = $1")
                .bind(&input.email)
                .fetch_one(&self.db)
                .await?;
        if existing > 0 {
            return Err(AppError::Conflict {
                resource: "admin_user".to_string(),
                message: "An account with this email already exists".to_string(),
                message_ja: "このメールアドレスは既に登録されています".to_string(),
            });
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let admin_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO admin_users (organization_id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(caller.organization_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(input.name.trim())
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(admin_id)
    }

    fn issue_tokens(
        &self,
        admin_id: Uuid,
        organization_id: Uuid,
        role: AdminRole,
    ) -> AppResult<AuthTokens> {
        let access_token =
            self.encode_token(admin_id, organization_id, role, self.access_token_expiry)?;
        let refresh_token =
            self.encode_token(admin_id, organization_id, role, self.refresh_token_expiry)?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    fn encode_token(
        &self,
        admin_id: Uuid,
        organization_id: Uuid,
        role: AdminRole,
        expiry_secs: i64,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: admin_id.to_string(),
            organization_id: organization_id.to_string(),
            role: role.as_str().to_string(),
            exp: (now + Duration::seconds(expiry_secs)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    fn decode_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })
    }
}
