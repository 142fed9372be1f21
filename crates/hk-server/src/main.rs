use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use hk_core::services::config_loader;
use hk_core::services::launcher::DeployLauncher;
use hk_core::services::storage::LocalProjectStore;
use hk_server::api::{self, AppState};

/// Project workspace and per-user deploy server.
#[derive(Parser)]
#[command(name = "hk-server", version, about)]
struct Cli {
    /// Path to the YAML config file (default: ./hk-server.yaml if present)
    #[arg(short, long, env = "HK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long, env = "HK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// HTTP bind port
    #[arg(long, env = "HK_PORT", default_value_t = 8000)]
    port: u16,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "HK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Write logs to this file instead of stdout
    #[arg(long, env = "HK_LOG_FILE", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Allow cross-origin requests from any origin
    #[arg(long, env = "HK_CORS")]
    cors: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Load .env before parsing so env-backed flags and EMAIL_PORT_* entries see it.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let _guard = init_logging(&cli.log_level, cli.log_file.as_deref())?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).wrap_err("failed to read .env"),
    }

    let working_directory = std::env::current_dir()?;
    let config = config_loader::discover(cli.config.as_deref(), &working_directory)
        .wrap_err("failed to load configuration")?;
    let env = config_loader::unicode_env_vars(std::env::vars_os())
        .wrap_err("invalid environment")?;
    let assignments = config_loader::resolve_assignments(&config, env)
        .wrap_err("invalid port assignments")?;

    if assignments.is_empty() {
        tracing::warn!("no port assignments configured; every deploy will be rejected");
    }
    for (identity, port) in assignments.iter() {
        tracing::debug!(identity, port, "port assigned");
    }
    tracing::info!(
        identities = assignments.len(),
        projects_root = %config.projects_root.display(),
        log_dir = %config.log_dir.display(),
        "configuration loaded"
    );

    let launcher = Arc::new(DeployLauncher::from_config(&config, assignments));
    let store = Arc::new(LocalProjectStore::new(&config.projects_root));
    let state = AppState::new(launcher.clone(), store, config.max_upload_bytes);

    let mut app = api::router(state);
    if cli.cors {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("HTTP server failed")?;

    if config.stop_on_shutdown {
        tracing::info!("stopping deployments");
        launcher.shutdown().await;
    }
    tracing::info!("server stopped");
    Ok(())
}

/// Configure tracing to stdout, or to `log_file` through a non-blocking writer.
/// The returned guard must be held for the duration of the program.
fn init_logging(
    level: &str,
    log_file: Option<&Path>,
) -> color_eyre::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err("invalid log filter")?;

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
        return Ok(None);
    };

    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("--log-file must name a file"))?;
    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
