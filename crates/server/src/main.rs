mod db;
mod entity;
mod repository;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use assignment_engine::{Backends, Engine, EngineConfig, EngineEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::repository::{SeaOrmProgressRepository, SeaOrmSubmissionRepository};

const DEFAULT_CONFIG_PATH: &str = "codelab.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting codelab server");
    let config_path =
        env::var("CODELAB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!(path = %config_path, "loading engine config");
    let config = EngineConfig::from_file(&config_path)
        .with_context(|| format!("failed to load engine config from {config_path}"))?;

    let db = db::init_pool_and_migrate()
        .await
        .context("failed to initialize database")?;
    info!("database connected and migrated");

    let backends = Backends::from_config(
        &config,
        Arc::new(SeaOrmSubmissionRepository::new(db.clone())),
        Arc::new(SeaOrmProgressRepository::new(db)),
    );
    let engine = Engine::new(config, backends);

    for profile in engine.languages() {
        info!(
            id = %profile.id,
            display_name = %profile.display_name,
            runtime = %profile.runtime_id,
            version = %profile.runtime_version,
            "language available"
        );
    }

    let mut event_stream = engine.subscribe_events();
    info!("subscribed to engine event stream");
    info!("server is ready, press Ctrl+C to shut down");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping server");
                break;
            }
            event = event_stream.recv() => {
                if !log_event(event) {
                    break;
                }
            }
        }
    }

    for session in engine.active_sessions().await {
        if let Err(err) = engine.close_session(&session.id).await {
            warn!(session_id = %session.id, error = %err, "failed to close session");
        }
    }

    info!("server shutdown complete");
    Ok(())
}

/// 记录一条引擎事件。返回 `false` 表示事件流已关闭。
fn log_event(event: Result<EngineEvent, RecvError>) -> bool {
    match event {
        Ok(event) => {
            info!(?event, "engine event");
            true
        }
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "event stream lagged, continuing with newer events");
            true
        }
        Err(RecvError::Closed) => {
            warn!("engine event stream closed");
            false
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
