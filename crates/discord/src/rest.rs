use std::sync::Arc;

use async_trait::async_trait;
use serenity::all as discord;
use serenity::http::Http;

use crate::platform::{
    ChannelId, ChannelKind, CreatedThread, GuildChannel, GuildId, PlatformError, ResearchPlatform,
    ThreadRequest,
};

/// [`ResearchPlatform`] backed by the Discord REST API.
///
/// Built from the bot token on its own, independent of the gateway session,
/// so the pipeline never reaches into gateway state.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub fn new(token: &str) -> Self {
        Self { http: Arc::new(Http::new(token)) }
    }
}

#[async_trait]
impl ResearchPlatform for SerenityPlatform {
    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<GuildChannel>, PlatformError> {
        let channels =
            discord::GuildId::new(guild_id.0).channels(&*self.http).await.map_err(platform_error)?;

        let mut listed: Vec<GuildChannel> = channels
            .into_values()
            .map(|channel| GuildChannel {
                id: ChannelId(channel.id.get()),
                kind: channel_kind(channel.kind),
                parent_id: channel.parent_id.map(|parent| ChannelId(parent.get())),
                name: channel.name,
            })
            .collect();
        // The API returns a map; sort so duplicate names resolve the same way every time.
        listed.sort_by_key(|channel| channel.id);
        Ok(listed)
    }

    async fn create_thread(
        &self,
        channel_id: ChannelId,
        request: &ThreadRequest,
    ) -> Result<CreatedThread, PlatformError> {
        let builder = discord::CreateThread::new(request.name.clone())
            .kind(discord::ChannelType::PublicThread)
            .auto_archive_duration(auto_archive_duration(request.auto_archive_minutes))
            .audit_log_reason(&request.reason);

        let thread = discord::ChannelId::new(channel_id.0)
            .create_thread(&*self.http, builder)
            .await
            .map_err(platform_error)?;

        Ok(CreatedThread { id: ChannelId(thread.id.get()), name: thread.name })
    }

    async fn send_message(&self, thread_id: ChannelId, content: &str) -> Result<(), PlatformError> {
        discord::ChannelId::new(thread_id.0)
            .send_message(&*self.http, discord::CreateMessage::new().content(content))
            .await
            .map(|_| ())
            .map_err(platform_error)
    }
}

fn channel_kind(kind: discord::ChannelType) -> ChannelKind {
    match kind {
        discord::ChannelType::Category => ChannelKind::Category,
        discord::ChannelType::Text => ChannelKind::Text,
        _ => ChannelKind::Other,
    }
}

fn auto_archive_duration(minutes: u16) -> discord::AutoArchiveDuration {
    match minutes {
        60 => discord::AutoArchiveDuration::OneHour,
        4320 => discord::AutoArchiveDuration::ThreeDays,
        10080 => discord::AutoArchiveDuration::OneWeek,
        _ => discord::AutoArchiveDuration::OneDay,
    }
}

fn platform_error(error: serenity::Error) -> PlatformError {
    let status = match &error {
        serenity::Error::Http(http_error) => http_error.status_code().map(|status| status.as_u16()),
        _ => None,
    };
    classify(status, error.to_string())
}

fn classify(status: Option<u16>, message: String) -> PlatformError {
    match status {
        Some(403) => PlatformError::Forbidden(message),
        Some(429) => PlatformError::RateLimited(message),
        _ => PlatformError::Request(message),
    }
}
