//! Error handling for the Fleet Safety Management Platform
//!
//! Provides consistent error responses in English and Japanese

use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        message_ja: String,
    },

    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        message_ja: String,
    },

    #[error("Driver not registered")]
    NotRegistered,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_ja: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_ja: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Link-token lifecycle errors
    #[error("Link token not found")]
    LinkTokenNotFound,

    #[error("Link token expired")]
    LinkTokenExpired,

    #[error("Link token already used")]
    LinkTokenAlreadyUsed,

    #[error("LINE account already linked to another user")]
    LineAccountAlreadyLinked,

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    // External service errors
    #[error("LINE API error: {0}")]
    LineApiError(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_ja: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_CREDENTIALS".to_string(),
                    message_en: "Invalid email or password".to_string(),
                    message_ja: "メールアドレスまたはパスワードが正しくありません".to_string(),
                    field: None,
                },
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "TOKEN_EXPIRED".to_string(),
                    message_en: "Token has expired".to_string(),
                    message_ja: "トークンの有効期限が切れています".to_string(),
                    field: None,
                },
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_ja: "トークンが正しくありません".to_string(),
                    field: None,
                },
            ),
            AppError::Unauthorized {
                message,
                message_ja,
            } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "UNAUTHORIZED".to_string(),
                    message_en: message.clone(),
                    message_ja: message_ja.clone(),
                    field: None,
                },
            ),
            AppError::Forbidden {
                message,
                message_ja,
            } => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "FORBIDDEN".to_string(),
                    message_en: message.clone(),
                    message_ja: message_ja.clone(),
                    field: None,
                },
            ),
            AppError::NotRegistered => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "NOT_REGISTERED".to_string(),
                    message_en: "Driver registration is not complete".to_string(),
                    message_ja: "ドライバー登録がされていません。管理者から受け取った登録URLを開いて、LINE連携を完了してください。"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_ja,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_ja: message_ja.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_ja: format!("入力値が正しくありません: {}", msg),
                    field: None,
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_ja,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_ja: message_ja.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_ja: format!("{} が見つかりません", resource),
                    field: None,
                },
            ),
            AppError::LinkTokenNotFound => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "LINK_TOKEN_NOT_FOUND".to_string(),
                    message_en: "Invalid registration token. Please contact your administrator."
                        .to_string(),
                    message_ja: "無効な登録トークンです。管理者に確認してください。".to_string(),
                    field: None,
                },
            ),
            AppError::LinkTokenExpired => (
                StatusCode::GONE,
                ErrorDetail {
                    code: "LINK_TOKEN_EXPIRED".to_string(),
                    message_en:
                        "Registration token has expired. Please ask your administrator to reissue it."
                            .to_string(),
                    message_ja: "登録トークンの有効期限が切れています。管理者に再発行を依頼してください。"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::LinkTokenAlreadyUsed => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "LINK_TOKEN_ALREADY_USED".to_string(),
                    message_en: "Registration token has already been used".to_string(),
                    message_ja: "この登録トークンは既に使用されています".to_string(),
                    field: None,
                },
            ),
            AppError::LineAccountAlreadyLinked => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "LINE_ACCOUNT_ALREADY_LINKED".to_string(),
                    message_en: "This LINE account is already linked to another user".to_string(),
                    message_ja: "このLINEアカウントは既に別のユーザーに紐付けられています"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message_en: format!(
                        "Too many requests. Retry after {} seconds.",
                        retry_after_secs
                    ),
                    message_ja: "リクエスト数が上限を超えました。しばらく待ってから再度お試しください。"
                        .to_string(),
                    field: None,
                },
            ),
            AppError::LineApiError(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "LINE_API_ERROR".to_string(),
                    message_en: format!("LINE API error: {}", msg),
                    message_ja: format!("LINE APIでエラーが発生しました: {}", msg),
                    field: None,
                },
            ),
            AppError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "EXTERNAL_SERVICE_ERROR".to_string(),
                    message_en: format!("External service error: {}", msg),
                    message_ja: format!("外部サービスでエラーが発生しました: {}", msg),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Service not configured: {}", msg),
                    message_ja: "サービスが設定されていません".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_ja: "データベースエラーが発生しました".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_ja: "内部エラーが発生しました".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_ja: "内部エラーが発生しました".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = (status, Json(ErrorResponse { error: error_detail })).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
