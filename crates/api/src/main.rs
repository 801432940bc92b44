use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use musicclub_notify::{DisabledNotifier, Notifier, TelegramNotifier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use musicclub_api::background::topic_backfill;
use musicclub_api::config::ServerConfig;
use musicclub_api::router::build_app_router;
use musicclub_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "musicclub_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = musicclub_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    musicclub_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    musicclub_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Notifier ---
    let notifier: Arc<dyn Notifier> = if config.telegram.is_complete() {
        let telegram = TelegramNotifier::new(config.telegram.clone())
            .expect("Failed to build Telegram HTTP client");
        tracing::info!(timeout_secs = config.telegram.timeout.as_secs(), "Telegram notifier enabled");
        Arc::new(telegram)
    } else {
        tracing::warn!("BOT_TOKEN or CHAT_ID not set, chat notifications disabled");
        Arc::new(DisabledNotifier)
    };

    // --- App state ---
    let state = AppState::new(pool.clone(), config.clone(), notifier);

    // --- Topic backfill ---
    let backfill_cancel = tokio_util::sync::CancellationToken::new();
    let backfill_handle = tokio::spawn(topic_backfill::run(
        pool,
        Arc::clone(&state.topics),
        config.topic_backfill_interval(),
        backfill_cancel.clone(),
    ));

    let dispatcher = state.dispatcher.clone();
    let app = build_app_router(state, &config);

    // --- Start server ---
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

    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    backfill_cancel.cancel();
    if tokio::time::timeout(grace, backfill_handle).await.is_err() {
        tracing::warn!("Topic backfill did not stop within the shutdown grace period");
    }

    dispatcher.drain(grace).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
        () = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
