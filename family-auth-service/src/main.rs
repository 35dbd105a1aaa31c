use family_auth_service::{
    build_router,
    config::{AuthConfig, NotifierKind, StoreBackend},
    db,
    services::{
        CredentialStore, InMemoryStore, LogNotifier, Notifier, PgStore, SmtpNotifier,
        SuperAdminAccount,
    },
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::spawn_limiter_housekeeping;
use service_core::observability::{init_tracing, install_prometheus_recorder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

const LIMITER_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let metrics = install_prometheus_recorder()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting family auth service"
    );

    let store: Arc<dyn CredentialStore> = match config.store {
        StoreBackend::Postgres => {
            tracing::info!("Initializing database connection pool");
            Arc::new(PgStore::new(db::connect(&config.database).await?))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match (config.notifier.kind, &config.notifier.smtp) {
        (NotifierKind::Smtp, Some(smtp)) => {
            Arc::new(SmtpNotifier::new(smtp).map_err(AppError::ConfigError)?)
        }
        (NotifierKind::Smtp, None) => {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NOTIFIER=smtp requires SMTP_HOST, SMTP_USER, SMTP_PASSWORD and SMTP_FROM"
            )))
        }
        (NotifierKind::Log, _) => Arc::new(LogNotifier),
    };
    tracing::info!(notifier = ?config.notifier.kind, "Notifier initialized");

    let super_admin = match &config.super_admin {
        Some(super_admin) => Some(
            SuperAdminAccount::provision(store.as_ref(), super_admin)
                .await
                .map_err(AppError::from)?,
        ),
        None => {
            tracing::warn!("No super admin configured; onboarding requests cannot be reviewed");
            None
        }
    };

    if config.magic_link.enabled {
        tracing::warn!("Deprecated magic link login is enabled");
    }

    let state = AppState::new(config.clone(), store, notifier, super_admin, Some(metrics))?;
    spawn_limiter_housekeeping(state.rate_limiters(), LIMITER_HOUSEKEEPING_INTERVAL);
    let app = build_router(state).await?;

    let addr = config.common.socket_addr();

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
