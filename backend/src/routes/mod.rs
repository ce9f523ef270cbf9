//! Route definitions for the Fleet Safety Management Platform

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public + protected provisioning)
        .nest("/auth", auth_routes())
        // LINE webhook (public - for LINE Messaging API)
        .route("/webhook/line", post(handlers::handle_line_webhook))
        // LIFF endpoints (public - authenticated by LINE ID token)
        .nest("/liff", liff_routes())
        // Scheduled jobs (authenticated by scheduler shared secret)
        .nest("/jobs", job_routes())
        // Protected routes - driver link management
        .nest("/drivers", driver_link_routes())
        // Protected routes - admin link management
        .nest("/admin-users", admin_link_routes())
        // Protected routes - organization settings
        .nest("/organizations", organization_routes())
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .nest("/admins", admin_provisioning_routes())
}

/// Admin provisioning (protected, org_admin enforced in the service)
fn admin_provisioning_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_admin))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// LIFF endpoints for the driver app
fn liff_routes() -> Router<AppState> {
    Router::new()
        .route("/link", post(handlers::link_driver))
        .route("/reports", post(handlers::handle_liff_reports))
        .route("/shifts", post(handlers::handle_liff_shifts))
}

/// Scheduled-job trigger endpoints
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/check-submissions", post(handlers::check_submissions))
        .route("/morning-reminder", post(handlers::morning_reminder))
}

/// Driver link management (protected)
fn driver_link_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:driver_id/registration-token",
            post(handlers::issue_driver_token),
        )
        .route("/:driver_id/line-link", delete(handlers::unlink_driver))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Admin link management (protected)
fn admin_link_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:admin_id/line-token",
            post(handlers::issue_admin_line_token),
        )
        .route("/:admin_id/line-link", delete(handlers::unlink_admin_line))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Organization settings (protected)
fn organization_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notification-settings",
            get(handlers::get_notification_settings)
                .put(handlers::update_notification_settings),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
