#![forbid(unsafe_code)]

//! `mina-bridge` — gateway server binary.
//!
//! Bootstraps configuration, restores the remote session from the credential
//! file if one is present, starts the credential watcher, and serves the
//! HTTP gateway until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use mina_bridge::auth::JwtAuth;
use mina_bridge::config::GlobalConfig;
use mina_bridge::gateway::{self, AppState};
use mina_bridge::remote::{MinaClient, RemoteAccount};
use mina_bridge::session::{CredentialFileWatcher, CredentialStore, SessionCacheManager};
use mina_bridge::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "mina-bridge", about = "Remote speaker account gateway", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("mina-bridge server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    let store = Arc::new(CredentialStore::new(config.credential_file.clone()));
    let client = MinaClient::new(&config.remote, Arc::clone(&store))?;
    let remote: Arc<dyn RemoteAccount> = Arc::new(client);
    let manager = Arc::new(SessionCacheManager::new(
        remote,
        Arc::clone(&store),
        config.device_cache_ttl(),
    ));
    let jwt = Arc::new(JwtAuth::new(&config.jwt)?);

    // Best-effort startup restore; the server runs logged-out if it fails.
    if manager.restore_from_file().await {
        info!("remote session restored from credential file");
    } else {
        info!("no usable credential on disk; waiting for login or file change");
    }

    let watcher = CredentialFileWatcher::new(
        Arc::clone(&manager),
        Arc::clone(&store),
        config.watcher_poll_interval(),
    );
    watcher.start();

    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let state = AppState {
        config: Arc::clone(&config),
        manager: Arc::clone(&manager),
        jwt,
    };
    let server_handle = tokio::spawn(async move {
        if let Err(err) = gateway::serve(state, server_ct).await {
            error!(%err, "gateway server failed");
        }
    });

    info!("mina-bridge ready");

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();
    watcher.stop().await;

    let _ = server_handle.await;
    info!("mina-bridge shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
