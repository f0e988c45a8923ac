use async_trait::async_trait;
use threadloom_core::ApplicationError;

use crate::{
    dispatch::DispatchReport,
    platform::{ChannelId, GuildId, MessageId, UserId},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCreateEvent {
    pub message_id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author: Author,
    pub mentions_bot: bool,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
}

impl Author {
    /// Inline mention markup, rendered by clients as `@name`.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

impl EventContext {
    pub fn for_message(event: &MessageCreateEvent) -> Self {
        Self { correlation_id: event.message_id.0.to_string() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    FromBot,
    OutsideGuild,
    NotMentioned,
    NoAttachment,
    NotCsv,
}

impl IgnoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FromBot => "from_bot",
            Self::OutsideGuild => "outside_guild",
            Self::NotMentioned => "not_mentioned",
            Self::NoAttachment => "no_attachment",
            Self::NotCsv => "not_csv",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed(DispatchReport),
    Ignored(IgnoreReason),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        event: &MessageCreateEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, ApplicationError>;
}
