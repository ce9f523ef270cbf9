//! Business logic services for the Fleet Safety Management Platform

pub mod auth;
pub mod dispatch;
pub mod identity;
pub mod line;
pub mod organization;
pub mod pii;
pub mod rate_limit;
pub mod report;
pub mod shift;
pub mod signature;
pub mod token;
pub mod webhook;

pub use auth::AdminAuthService;
pub use dispatch::DispatchService;
pub use identity::IdentityService;
pub use line::LineMessagingClient;
pub use organization::OrganizationService;
pub use rate_limit::RateLimiter;
pub use report::ReportService;
pub use shift::ShiftService;
pub use token::LinkTokenService;
pub use webhook::WebhookService;
