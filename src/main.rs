//! deployhook: a deployment webhook listener.
//!
//! This is the application entry point. It initializes tracing, loads
//! configuration from an optional TOML file plus environment and CLI
//! overrides, wires the deploy trigger into the Axum router, and starts the
//! HTTP server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deployhook::config::{
    AppConfig, ConfigOverrides, LogFormat, DEFAULT_CONFIG_PATH, DEFAULT_LOG_FILTER,
};
use deployhook::http::start_server;
use deployhook::{create_router, AppState, ScriptTrigger};

/// deployhook: trigger a deployment script over HTTP
#[derive(Parser)]
#[command(name = "deployhook", version, about)]
struct Args {
    /// Path to configuration file [default: config/deployhook.toml, if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "deployhook=debug")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "DEPLOYHOOK_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    /// Address to bind
    #[arg(long, env = "DEPLOYHOOK_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DEPLOYHOOK_PORT")]
    port: Option<u16>,

    /// Shared secret callers must send
    #[arg(long, env = "DEPLOYHOOK_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Deployment script to run on a valid trigger
    #[arg(long, env = "DEPLOYHOOK_SCRIPT")]
    script: Option<PathBuf>,
}

fn init_tracing(filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(filter));
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration: file (or defaults), then env/CLI overrides
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    config.apply_overrides(ConfigOverrides {
        host: args.host,
        port: args.port,
        secret: args.secret,
        script: args.script,
        log_format: args.log_format,
    });

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    init_tracing(&log_filter, config.logging.format);

    config.validate()?;

    let source = match &args.config {
        Some(path) => path.display().to_string(),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH.to_string(),
        None => "built-in defaults".to_string(),
    };
    tracing::info!(source = %source, "Loaded configuration");
    tracing::info!(
        path = %config.deploy.path,
        script = %config.deploy.script.display(),
        interpreter = %config.deploy.interpreter,
        "Deploy endpoint configured"
    );
    if !config.deploy.script.exists() {
        tracing::warn!(
            script = %config.deploy.script.display(),
            "Deployment script does not exist yet; triggers will fail to launch"
        );
    }

    let trigger = Arc::new(ScriptTrigger::from_config(&config.deploy));
    let state = AppState::new(config.deploy.clone(), trigger);
    let app = create_router(state);

    start_server(app, &config.http).await?;

    Ok(())
}
