use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::all as discord;
use serenity::client::{Client, Context};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::events::{
    Attachment, Author, EventContext, EventHandler, HandlerResult, MessageCreateEvent,
};
use crate::platform::{ChannelId, GuildId, MessageId, UserId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Liveness counters shared between the gateway and the health endpoint.
#[derive(Debug, Default)]
pub struct GatewayStatus {
    connected: AtomicBool,
    uploads_processed: AtomicU64,
    uploads_failed: AtomicU64,
}

impl GatewayStatus {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn uploads_processed(&self) -> u64 {
        self.uploads_processed.load(Ordering::Relaxed)
    }

    pub fn uploads_failed(&self) -> u64 {
        self.uploads_failed.load(Ordering::Relaxed)
    }

    fn record(&self, succeeded: bool) {
        let counter = if succeeded { &self.uploads_processed } else { &self.uploads_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn intents() -> discord::GatewayIntents {
    discord::GatewayIntents::GUILDS
        | discord::GatewayIntents::GUILD_MESSAGES
        | discord::GatewayIntents::MESSAGE_CONTENT
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The gateway refused the session; retrying with the same token cannot help.
    #[error("gateway rejected the session: {0}")]
    Rejected(String),
    #[error("gateway session dropped: {0}")]
    Dropped(String),
}

/// One gateway session, from login until the connection ends.
#[async_trait]
pub trait GatewaySession: Send + Sync {
    async fn run(&self, bridge: GatewayBridge) -> Result<(), SessionError>;
}

/// Serenity client session. Shard reconnects and resumes happen inside
/// serenity; `run` only returns once the client gives up.
pub struct SerenitySession {
    token: SecretString,
}

impl SerenitySession {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl GatewaySession for SerenitySession {
    async fn run(&self, bridge: GatewayBridge) -> Result<(), SessionError> {
        let mut client = Client::builder(self.token.expose_secret(), intents())
            .event_handler(bridge)
            .await
            .map_err(session_error)?;
        client.start().await.map_err(session_error)
    }
}

fn session_error(error: serenity::Error) -> SessionError {
    let rejected = matches!(
        &error,
        serenity::Error::Gateway(
            discord::GatewayError::InvalidAuthentication
                | discord::GatewayError::NoAuthentication
                | discord::GatewayError::InvalidGatewayIntents
                | discord::GatewayError::DisallowedGatewayIntents
        )
    );
    if rejected {
        SessionError::Rejected(error.to_string())
    } else {
        SessionError::Dropped(error.to_string())
    }
}

pub struct GatewayRunner {
    session: Arc<dyn GatewaySession>,
    handler: Arc<dyn EventHandler>,
    status: Arc<GatewayStatus>,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        session: Arc<dyn GatewaySession>,
        handler: Arc<dyn EventHandler>,
        status: Arc<GatewayStatus>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { session, handler, status, reconnect_policy }
    }

    pub fn status(&self) -> Arc<GatewayStatus> {
        self.status.clone()
    }

    /// Runs gateway sessions, starting a fresh one with backoff when a session
    /// drops. A rejected session (bad token, disallowed intents) ends the
    /// runner with an error; exhausting the retries does not.
    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            info!(attempt, "opening discord gateway session");
            let bridge = GatewayBridge::new(self.handler.clone(), self.status.clone());

            match self.session.run(bridge).await {
                Ok(()) => return Ok(()),
                Err(SessionError::Rejected(reason)) => {
                    self.status.set_connected(false);
                    error!(
                        event_name = "system.gateway.rejected",
                        error = %reason,
                        "discord gateway rejected the session"
                    );
                    bail!("discord gateway rejected the session: {reason}");
                }
                Err(SessionError::Dropped(reason)) => {
                    self.status.set_connected(false);
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %reason,
                        "discord gateway session failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "discord gateway retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Adapts gateway callbacks to the platform-neutral [`EventHandler`].
pub struct GatewayBridge {
    handler: Arc<dyn EventHandler>,
    status: Arc<GatewayStatus>,
}

impl GatewayBridge {
    pub fn new(handler: Arc<dyn EventHandler>, status: Arc<GatewayStatus>) -> Self {
        Self { handler, status }
    }

    pub async fn process(&self, event: MessageCreateEvent) -> Option<HandlerResult> {
        let context = EventContext::for_message(&event);
        match self.handler.handle(&event, &context).await {
            Ok(HandlerResult::Ignored(reason)) => {
                debug!(
                    correlation_id = %context.correlation_id,
                    reason = reason.label(),
                    "message ignored"
                );
                Some(HandlerResult::Ignored(reason))
            }
            Ok(result) => {
                self.status.record(true);
                Some(result)
            }
            Err(error) => {
                self.status.record(false);
                warn!(
                    event_name = "ingress.discord.upload_failed",
                    correlation_id = %context.correlation_id,
                    error_class = error.class(),
                    error = %error,
                    "upload processing failed; continuing gateway session"
                );
                None
            }
        }
    }
}

#[async_trait]
impl discord::EventHandler for GatewayBridge {
    async fn ready(&self, _ctx: Context, ready: discord::Ready) {
        self.status.set_connected(true);
        info!(
            event_name = "system.gateway.ready",
            bot_user = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord gateway session ready"
        );
    }

    async fn resume(&self, _ctx: Context, _event: discord::ResumedEvent) {
        self.status.set_connected(true);
        info!(event_name = "system.gateway.resumed", "discord gateway session resumed");
    }

    async fn shard_stage_update(&self, _ctx: Context, event: discord::ShardStageUpdateEvent) {
        self.status.set_connected(stage_is_live(event.new));
        debug!(
            shard = event.shard_id.0,
            from = ?event.old,
            to = ?event.new,
            "discord gateway shard changed stage"
        );
    }

    async fn message(&self, ctx: Context, message: discord::Message) {
        let mentions_bot = message.mentions_me(&ctx).await.unwrap_or(false);
        self.process(message_event(&message, mentions_bot)).await;
    }
}

fn stage_is_live(stage: discord::ConnectionStage) -> bool {
    matches!(stage, discord::ConnectionStage::Connected)
}

fn message_event(message: &discord::Message, mentions_bot: bool) -> MessageCreateEvent {
    MessageCreateEvent {
        message_id: MessageId(message.id.get()),
        guild_id: message.guild_id.map(|id| GuildId(id.get())),
        channel_id: ChannelId(message.channel_id.get()),
        author: Author {
            id: UserId(message.author.id.get()),
            name: message.author.name.clone(),
            bot: message.author.bot,
        },
        mentions_bot,
        attachments: message
            .attachments
            .iter()
            .map(|attachment| Attachment {
                filename: attachment.filename.clone(),
                url: attachment.url.clone(),
            })
            .collect(),
    }
}
