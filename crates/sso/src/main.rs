use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use sso::api::{AppState, create_router};
use sso::auth::{BcryptHasher, IdentityService};
use sso::config::{AppConfig, resolve_config_path};
use sso::db::Database;
use sso::storage::SqliteStore;

const APP_NAME: &str = "sso";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.common.config.clone());
    let config = AppConfig::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("loading config from {}", path.display()),
        None => "loading config".to_string(),
    })?;

    init_logging(&cli.common, &config);
    debug!(config_path = ?config_path, "configuration loaded");

    match cli.command {
        Command::Serve => serve(config),
        Command::Config { command } => handle_config(&config, command),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = APP_NAME,
    author,
    version,
    about = "SSO - credential verification and app-scoped token issuance.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path (falls back to CONFIG_PATH)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true)]
    no_color: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration with secrets masked
    Show,
}

/// Level chosen by flags, or `None` to use the environment's default.
fn flag_log_level(common: &CommonOpts) -> Option<LevelFilter> {
    if common.quiet {
        Some(LevelFilter::Error)
    } else if common.trace {
        Some(LevelFilter::Trace)
    } else if common.debug {
        Some(LevelFilter::Debug)
    } else {
        match common.verbose {
            0 => None,
            1 => Some(LevelFilter::Debug),
            _ => Some(LevelFilter::Trace),
        }
    }
}

fn init_logging(common: &CommonOpts, config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let level = flag_log_level(common)
        .map(|l| l.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| config.env.default_log_level().to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

    if common.json || config.env.json_logs() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        let disable_color = common.no_color
            || std::env::var_os("NO_COLOR").is_some()
            || !io::stderr().is_terminal();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
            .try_init()
            .ok();
    }

    // Also init env_logger for compatibility with log crate users
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&level));
    if let Some(level) = flag_log_level(common) {
        builder.filter_level(level);
    }
    builder.try_init().ok();
}

fn handle_config(config: &AppConfig, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let rendered =
                toml::to_string_pretty(&config.redacted()).context("serializing config")?;
            println!("{rendered}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn serve(config: AppConfig) -> Result<()> {
    info!(env = ?config.env, "starting {APP_NAME}");

    let db = Database::open(&config.storage_path)
        .await
        .with_context(|| format!("opening storage {}", config.storage_path.display()))?;
    let store = Arc::new(SqliteStore::new(db.pool().clone()));

    let cost = config.auth.password_cost;
    let hasher = tokio::task::spawn_blocking(move || BcryptHasher::new(cost).with_decoy())
        .await
        .context("preparing password hasher")?;

    let identity = IdentityService::new(store.clone(), store, config.token_ttl)
        .with_hasher(Arc::new(hasher));

    let shutdown = CancellationToken::new();
    let state = AppState::new(identity)
        .with_timeout(config.http.timeout)
        .with_shutdown(shutdown.clone())
        .with_admin_token(config.http.admin_token.as_deref());

    if !state.admin_guarded() {
        tracing::warn!("no admin token configured; administrative routes are open");
    }

    let app = create_router(state);

    let host = config.http.bind_host();
    let port = config.http.port;
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding to {host}:{port}"))?;
    let addr = listener.local_addr().context("reading bound address")?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("running server")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, cancelling in-flight requests");
    shutdown.cancel();
}
