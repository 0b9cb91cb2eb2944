// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Boothprint: HTTP print station for photo booths
//
// Entry point. Initialises logging, resolves settings, wires the services to
// the real spooler and serves the router.

use std::process::ExitCode;
use std::sync::Arc;

use boothprint_print::{IppProbe, SystemRunner};
use boothprint_server::{AppState, Settings, router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Boothprint starting");

    match run(Settings::from_env()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&settings.staging_dir).await?;
    tracing::info!(
        config = %settings.config_path.display(),
        staging = %settings.staging_dir.display(),
        cups = %settings.cups_uri,
        "settings resolved"
    );

    let bind = settings.bind;
    let probe = Arc::new(IppProbe::new(settings.cups_uri.clone()));
    let state = AppState::new(settings, Arc::new(SystemRunner), probe).await;

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "print server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
