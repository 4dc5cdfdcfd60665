// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, time::Duration};

use axum_server::Handle;
use quyx_auth_server::{
    api::router,
    auth::TokenIssuer,
    config::{LogFormat, ServerConfig},
    state::AppState,
    storage::AuthDatabase,
    tls::load_tls_config,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_on_ctrl_c(handle: Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Could not listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown requested, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );
    let config = config.inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider was already installed");
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let db = AuthDatabase::open(&config.database_path())?;
    tracing::info!(path = %config.database_path().display(), "Database opened");

    let tokens = match &config.token_keys {
        Some(keys) => {
            TokenIssuer::from_pem(keys, config.access_token_ttl, config.refresh_token_ttl)?
        }
        None => {
            tracing::warn!("No token signing key configured, using an ephemeral key");
            TokenIssuer::ephemeral(config.access_token_ttl, config.refresh_token_ttl)?
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let tls_paths = config.tls_cert_path.clone().zip(config.tls_key_path.clone());

    let state = AppState::new(config, db, tokens);
    let app = router(state);

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    match tls_paths {
        Some((cert, key)) => {
            let tls_config = load_tls_config(&cert, &key).await?;
            tracing::info!(%addr, "Quyx auth server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "Quyx auth server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    Ok(())
}
