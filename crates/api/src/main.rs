use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ebic_api::config::{MessagingConfig, ServerConfig};
use ebic_api::router::build_app_router;
use ebic_api::state::{AppState, Channels};
use ebic_messaging::{EmailSender, FileReportGenerator, PgStore, WhatsAppSender};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ebic_api=debug,ebic_messaging=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let messaging = MessagingConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        embedded_report_worker = config.embedded_report_worker,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = ebic_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    ebic_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    ebic_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Channels ---
    let email = EmailSender::from_env().expect("Failed to build email sender");
    let whatsapp = WhatsAppSender::from_env().expect("Failed to build WhatsApp sender");
    if !email.is_configured() {
        tracing::warn!("SMTP not configured, email sender runs in mock mode");
    }
    if !whatsapp.is_configured() {
        tracing::warn!("WhatsApp not configured, sender runs in mock mode");
    }
    let channels = Channels {
        email: Arc::new(email),
        whatsapp: Arc::new(whatsapp),
    };

    // --- App state ---
    let worker_config = messaging.reports.clone();
    let state = AppState::new(
        config.clone(),
        Arc::new(PgStore::new(pool)),
        channels,
        messaging,
        FileReportGenerator::from_env(),
    );

    // --- Report worker ---
    let cancel = CancellationToken::new();
    let worker_handle = config.embedded_report_worker.then(|| {
        let worker = state.report_worker(worker_config);
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    });

    // --- Start server ---
    let app = build_app_router(state, &config);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Report worker stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
