//! Secretgate - REST facade over a versioned secret store
//!
//! Serves list/create/read/update/delete of named secrets for one project,
//! backed by a versioned secret store and a process-local cache.

mod handlers;
mod logger;
mod router;

use clap::Parser;
use secretgate_manager::{MemoryStore, SecretManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "secretgate")]
#[command(about = "REST facade over a versioned secret store", long_about = None)]
struct Args {
    /// Project whose secrets are served
    #[arg(env = "SECRETGATE_PROJECT")]
    project: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "SECRETGATE_PORT")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SECRETGATE_HOST")]
    host: String,

    /// Directory for access and error logs
    #[arg(long, default_value = "/var/log/secretgate", env = "SECRETGATE_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SECRETGATE_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("secretgate={},tower_http=debug", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let logs = Arc::new(logger::LogFiles::open(&args.log_dir)?);
    let manager = SecretManager::new(&args.project, Arc::new(MemoryStore::new()));
    info!("Serving secrets for {}", manager.project());

    let app = router::create_router(router::AppState { manager, logs });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
