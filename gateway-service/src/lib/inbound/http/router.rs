use std::sync::Arc;
use std::time::Duration;

use auth::ServiceAuthenticator;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::cancel_otp::cancel_otp;
use super::handlers::create_guest_session::create_guest_session;
use super::handlers::guest_chat::guest_chat;
use super::handlers::issue_token::issue_token;
use super::handlers::otp_status::otp_status;
use super::handlers::rate_limit_status::rate_limit_status;
use super::handlers::request_otp::request_otp;
use super::handlers::tenants::tenant_health;
use super::handlers::tenants::tenant_info;
use super::handlers::tenants::tenant_process;
use super::handlers::verify_otp::verify_otp;
use super::handlers::verify_token::verify_token;
use super::middleware::authenticate_service;
use crate::config::OtpConfig;
use crate::domain::otp::service::OtpService;
use crate::domain::rate_limit::service::RateLimiter;
use crate::domain::session::service::SessionService;
use crate::domain::wizard::service::WizardService;
use crate::outbound::assistant::KeywordAssistant;
use crate::outbound::delivery::LogOtpDelivery;
use crate::outbound::repositories::PostgresAuthTempRepository;
use crate::outbound::repositories::PostgresOtpRepository;
use crate::outbound::repositories::PostgresRateLimitRepository;
use crate::outbound::repositories::PostgresSessionStore;
use crate::outbound::repositories::PostgresTaskRepository;
use crate::outbound::repositories::PostgresUserRepository;

pub type AppRateLimiter = RateLimiter<PostgresRateLimitRepository>;
pub type AppOtpService = OtpService<PostgresOtpRepository, AppRateLimiter, LogOtpDelivery>;
pub type AppSessionService = SessionService<PostgresSessionStore>;
pub type AppWizardService = WizardService<
    PostgresSessionStore,
    PostgresAuthTempRepository,
    PostgresUserRepository,
    AppOtpService,
    KeywordAssistant,
    PostgresTaskRepository,
>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<AppSessionService>,
    pub wizard: Arc<AppWizardService>,
    pub otp: Arc<AppOtpService>,
    pub rate_limiter: Arc<AppRateLimiter>,
    pub authenticator: Arc<ServiceAuthenticator>,
    pub otp_config: OtpConfig,
}

pub fn create_router(state: AppState) -> Router {
    let service_auth_routes = Router::new()
        .route("/auth/token", post(issue_token))
        .route("/auth/verify", post(verify_token));

    let otp_routes = Router::new()
        .route("/auth/otp/request", post(request_otp))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/otp/rate-limit/:identifier", get(rate_limit_status))
        .route("/auth/otp/cancel/:otp_id", delete(cancel_otp))
        .route("/auth/otp/status/:session_id", get(otp_status));

    let guest_routes = Router::new()
        .route("/chatbot/guest/session", post(create_guest_session))
        .route("/chatbot/guest", post(guest_chat));

    // Tenant routers share one shape; the bearer's service_name must match
    // the path tenant or the handler returns 403.
    let tenant_routes = Router::new()
        .route("/api/v1/:service/process", post(tenant_process))
        .route("/api/v1/:service/health", get(tenant_health))
        .route("/api/v1/:service/info", get(tenant_info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_service,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .route("/health", get(health))
        .merge(service_auth_routes)
        .merge(otp_routes)
        .merge(guest_routes)
        .merge(tenant_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
