use std::sync::Arc;
use std::time::Duration;

use auth::CredentialStore;
use auth::ServiceAuthenticator;
use auth::ServiceCredential;
use gateway_service::config::Config;
use gateway_service::domain::wizard::ports::AuthTempRepository;
use gateway_service::inbound::http::router::create_router;
use gateway_service::inbound::http::router::AppState;
use gateway_service::outbound::assistant::KeywordAssistant;
use gateway_service::outbound::delivery::LogOtpDelivery;
use gateway_service::outbound::repositories::PostgresAuthTempRepository;
use gateway_service::outbound::repositories::PostgresOtpRepository;
use gateway_service::outbound::repositories::PostgresRateLimitRepository;
use gateway_service::outbound::repositories::PostgresSessionStore;
use gateway_service::outbound::repositories::PostgresTaskRepository;
use gateway_service::outbound::repositories::PostgresUserRepository;
use gateway_service::OtpService;
use gateway_service::RateLimiter;
use gateway_service::SessionService;
use gateway_service::WizardService;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "gateway-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        tenants = config.tenants.len(),
        otp_validity_minutes = config.otp.validity_minutes,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let credential_store = CredentialStore::new(config.tenants.iter().map(|t| ServiceCredential {
        client_id: t.client_id.clone(),
        client_secret: t.client_secret.clone(),
        service_name: t.service_name.clone(),
    }));
    let authenticator = Arc::new(ServiceAuthenticator::new(
        credential_store,
        config.jwt.secret.as_bytes(),
        config.jwt.expiration_hours,
    ));

    let session_store = Arc::new(PostgresSessionStore::new(pg_pool.clone()));
    let temp_repository = Arc::new(PostgresAuthTempRepository::new(pg_pool.clone()));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let task_repository = Arc::new(PostgresTaskRepository::new(pg_pool.clone()));

    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(PostgresRateLimitRepository::new(pg_pool.clone())),
        config.otp.rate_limit_max_requests,
        config.otp.rate_limit_window_minutes,
    ));
    let otp_service = Arc::new(OtpService::new(
        Arc::new(PostgresOtpRepository::new(pg_pool.clone())),
        Arc::clone(&rate_limiter),
        Arc::new(LogOtpDelivery::new()),
        config.otp.validity_minutes,
    ));

    let session_service = Arc::new(SessionService::new(
        Arc::clone(&session_store),
        config.session.ttl_minutes,
    ));
    let wizard_service = Arc::new(WizardService::new(
        Arc::clone(&session_service),
        Arc::clone(&temp_repository),
        user_repository,
        Arc::clone(&otp_service),
        Arc::new(KeywordAssistant::new()),
        task_repository,
    ));

    // Expiry is data, not timers: the sweep just deletes rows whose time
    // has already passed.
    let sweep_interval = Duration::from_secs(config.session.cleanup_interval_minutes * 60);
    {
        let sessions = Arc::clone(&session_service);
        let temp = Arc::clone(&temp_repository);
        let otp = Arc::clone(&otp_service);
        let limiter = Arc::clone(&rate_limiter);
        let wizard = Arc::clone(&wizard_service);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;

                if let Err(e) = sessions.sweep_expired().await {
                    tracing::warn!(error = %e, "Session sweep failed");
                }
                if let Err(e) = temp.delete_expired().await {
                    tracing::warn!(error = %e, "Auth temp sweep failed");
                }
                if let Err(e) = otp.purge_stale().await {
                    tracing::warn!(error = %e, "OTP sweep failed");
                }
                if let Err(e) = limiter.purge_stale().await {
                    tracing::warn!(error = %e, "Rate limit sweep failed");
                }
                wizard.locks().prune().await;

                tracing::debug!("Maintenance sweep completed");
            }
        });
    }

    let state = AppState {
        sessions: session_service,
        wizard: wizard_service,
        otp: otp_service,
        rate_limiter,
        authenticator,
        otp_config: config.otp.clone(),
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(state)).await?;

    Ok(())
}
