use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use threadloom_core::config::{AppConfig, ConfigError};
use threadloom_discord::{
    dispatch::{DispatchSettings, ThreadDispatcher},
    fetch::{FetchError, HttpAttachmentFetcher},
    gateway::{GatewayRunner, GatewayStatus, ReconnectPolicy, SerenitySession},
    rest::SerenityPlatform,
    upload::UploadHandler,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub status: Arc<GatewayStatus>,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("attachment fetcher setup failed: {0}")]
    Fetcher(#[source] FetchError),
}

/// Wires the upload pipeline from an already loaded config. Nothing here
/// touches the network; the gateway connects when the runner starts.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        research_category = %config.discord.research_category,
        "starting application bootstrap"
    );

    let platform = Arc::new(SerenityPlatform::new(config.discord.token.expose_secret()));
    let fetcher = HttpAttachmentFetcher::new(Duration::from_secs(config.ingest.fetch_timeout_secs))
        .map_err(BootstrapError::Fetcher)?;

    let dispatcher = ThreadDispatcher::new(
        platform,
        DispatchSettings {
            research_category: config.discord.research_category.clone(),
            auto_archive_minutes: config.discord.thread_auto_archive_minutes,
        },
    );
    let handler =
        Arc::new(UploadHandler::new(Arc::new(fetcher), dispatcher, config.discord.rows_per_message));

    let status = Arc::new(GatewayStatus::default());
    let runner = GatewayRunner::new(
        Arc::new(SerenitySession::new(config.discord.token.clone())),
        handler,
        status.clone(),
        ReconnectPolicy::default(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        rows_per_message = config.discord.rows_per_message,
        "upload pipeline wired"
    );

    Ok(Application { config, status, runner })
}
