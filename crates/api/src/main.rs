use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use muse_api::config::ServerConfig;
use muse_api::router::build_app_router;
use muse_api::state::{AppState, Providers};
use muse_db::store::{ConversationStore, MemoryConversationStore, PgConversationStore};

/// Connect timeout of the shared outbound HTTP client.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "muse_api=debug,muse_providers=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid server configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let poll_ceiling = config.poll_ceiling();
    if Duration::from_secs(config.request_timeout_secs) <= poll_ceiling {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            poll_ceiling_secs = poll_ceiling.as_secs(),
            "Request timeout does not exceed the image poll ceiling",
        );
    }

    // --- Store ---
    let store: Arc<dyn ConversationStore> = match &config.database_url {
        Some(url) => match connect_postgres(url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::error!(error = %e, "Database setup failed");
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryConversationStore::new())
        }
    };

    // --- Providers ---
    let http = match reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };
    let providers = Providers::from_config(&config, http);

    // --- App state ---
    let shutdown = CancellationToken::new();
    let config = Arc::new(config);
    let state = AppState::new(store, Arc::clone(&config), providers, shutdown.clone());
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host: IpAddr = match config.host.parse() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
            return ExitCode::FAILURE;
        }
    };
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            return ExitCode::FAILURE;
        }
    };

    let signal_token = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Releases requests still waiting on an image job.
            signal_token.cancel();
        })
        .await;

    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Graceful shutdown complete");
    ExitCode::SUCCESS
}

async fn connect_postgres(url: &str) -> Result<PgConversationStore, Box<dyn std::error::Error>> {
    let pool = muse_db::create_pool(url).await?;
    tracing::info!("Database connection pool created");

    muse_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");

    muse_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(PgConversationStore::new(pool))
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
