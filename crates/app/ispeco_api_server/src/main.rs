//! ISPECO API server binary.
//!
//! Serves the REST API and the live relay WebSocket on one listener.

use clap::Parser;
use ispeco_api::config::ApiConfig;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server. Flags override the environment.
#[derive(Parser, Debug)]
#[command(name = "ispeco_api_server", about = "ISPECO API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 10)]
    max_connections: u32,

    /// Skip embedded migrations at startup.
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ispeco_api=debug,ispeco_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(url) = args.database_url {
        config.pg_connection_url = url;
    }
    info!(?config, "starting ispeco_api_server");

    if config.encryption_key.is_none() {
        warn!("no camera encryption key configured; credential endpoints and streaming will fail");
    }

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    if args.skip_migrations {
        info!("skipping database migrations");
    } else {
        info!("running database migrations");
        ispeco_api::migrate(&pool).await?;
    }

    let state = ispeco_api::AppState::new(pool, config.clone());
    let app = ispeco_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
