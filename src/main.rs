//! Pollinations Relay - API-key gated proxy for the Pollinations.ai text API
//!
//! Serves the JSON relay endpoints and the HTML admin panel used to issue and
//! manage relay keys.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use config::LogFormat;
use pollinations_relay::{
    config, create_router, db,
    services::{
        rate_limiter::spawn_prune_task, AdminSeed, AdminService, InMemorySessionStore,
        SlidingWindowLimiter,
    },
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    // Check for --help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    // Check for --version flag
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Pollinations Relay {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Pollinations Relay starting up");
    info!(
        upstream = %config.upstream.base_url,
        limit = config.relay.rate_limit_requests,
        window_secs = config.relay.rate_limit_window_secs,
        "Configuration loaded successfully"
    );

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    seed_admin(&config, &db).await?;

    let limiter = Arc::new(SlidingWindowLimiter::new());
    spawn_prune_task(limiter.clone(), config.relay.rate_limit_window());

    let sessions = Arc::new(InMemorySessionStore::new(config.admin.session_ttl()));
    let state = AppState::with_components(config.clone(), db, limiter, sessions)
        .context("Failed to build application state")?;

    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server is ready to accept connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Pollinations Relay stopped");
    Ok(())
}

/// Create the admin account on first start
async fn seed_admin(config: &AppConfig, db: &db::DbPool) -> Result<()> {
    let admins = AdminService::new(db.clone());
    let seed = admins
        .ensure_admin(&config.admin.username, config.admin.password.as_deref())
        .await
        .context("Failed to seed admin account")?;

    if let AdminSeed::Generated(password) = seed {
        // Shown once; only the hash is stored
        warn!(
            username = %config.admin.username,
            password = %password,
            "Generated initial admin password"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;
    let mut layers = Vec::new();
    let mut guard = None;

    if matches!(log_config.target, LogTarget::Console | LogTarget::Both) {
        layers.push(format_layer(&log_config.format, std::io::stdout));
    }
    if matches!(log_config.target, LogTarget::File | LogTarget::Both) {
        let (writer, file_guard) = create_file_writer(log_config);
        layers.push(format_layer(&log_config.format, writer));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
    guard
}

/// A formatting layer for `format` that writes to `writer`
fn format_layer<W>(
    format: &LogFormat,
    writer: W,
) -> Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::{fmt, Layer};

    let layer = fmt::layer().with_writer(writer);
    match format {
        LogFormat::Json => layer.json().with_target(true).boxed(),
        LogFormat::Compact => layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => layer
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Ensure the data directory exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    // Extract directory from database URL
    if let Some(path) = config.database.url.strip_prefix("sqlite://") {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create data directory")?;
                info!("Created data directory: {:?}", parent);
            }
        }
    }
    Ok(())
}

/// Wrap the application routes with CORS and request tracing
fn create_app(state: AppState) -> Router {
    // Browser clients call the relay directly from any origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    create_router(state).layer(trace_layer).layer(cors)
}

/// Print help message
fn print_help() {
    println!(
        r#"Pollinations Relay {}

USAGE:
    pollinations-relay [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    RELAY_CONFIG            Path to configuration file (default: config.yaml)
    RELAY_HOST, RELAY_PORT  Listen address (PORT is also honoured)
    DATABASE_URL            SQLite database URL
    RELAY_UPSTREAM_URL      Upstream text API base URL
    RELAY_RATE_LIMIT        Requests allowed per key and window
    RELAY_RATE_WINDOW_SECS  Rate limit window in seconds
    RELAY_ADMIN_USERNAME    Admin account created on first start
    RELAY_ADMIN_PASSWORD    Its password (generated and logged if unset)
    RUST_LOG                Log filter (overrides logging.level)

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by RELAY_CONFIG environment variable
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/pollinations-relay/config.yaml
    5. $XDG_CONFIG_HOME/pollinations-relay/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
