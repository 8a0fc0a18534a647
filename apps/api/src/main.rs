mod checks;
mod cli;
mod config;
mod crm;
mod db;
mod deploy;
mod email;
mod errors;
mod models;
mod routes;
mod state;
mod store;

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::open_store;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.into_command() {
        Command::Serve => serve(config).await,
        Command::Import(cmd) => cmd.run(&config).await,
        Command::Check(cmd) => cmd.run(),
        Command::Deploy(cmd) => cmd.run().await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting DiversIA API v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;
    info!("Storage backend: {}", store.backend());

    let state = AppState::new(store, config.clone());
    if state.email.is_configured() {
        info!("SendGrid email enabled (from: {})", config.email_from);
    } else {
        info!("SENDGRID_API_KEY not set; outbound email disabled");
    }

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
