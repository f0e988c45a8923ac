use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GuildId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChannelId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UserId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Category,
    Text,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildChannel {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    pub parent_id: Option<ChannelId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadRequest {
    pub name: String,
    pub auto_archive_minutes: u16,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedThread {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("missing permission: {0}")]
    Forbidden(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// The messaging operations the upload pipeline needs from the platform.
///
/// Implementations own authentication and rate limiting. Callers issue one
/// request at a time and await it before the next.
#[async_trait]
pub trait ResearchPlatform: Send + Sync {
    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<GuildChannel>, PlatformError>;

    async fn create_thread(
        &self,
        channel_id: ChannelId,
        request: &ThreadRequest,
    ) -> Result<CreatedThread, PlatformError>;

    async fn send_message(&self, thread_id: ChannelId, content: &str) -> Result<(), PlatformError>;
}

/// Snapshot of a guild's channels taken once per upload.
#[derive(Clone, Debug, Default)]
pub struct ChannelDirectory {
    channels: Vec<GuildChannel>,
}

impl ChannelDirectory {
    pub fn new(channels: Vec<GuildChannel>) -> Self {
        Self { channels }
    }

    /// Category lookup ignores case.
    pub fn category(&self, name: &str) -> Option<&GuildChannel> {
        let wanted = name.trim().to_lowercase();
        self.channels
            .iter()
            .find(|channel| channel.kind == ChannelKind::Category && channel.name.to_lowercase() == wanted)
    }

    /// Text channel lookup is exact, and only inside `category`.
    pub fn text_channel_in(&self, category: ChannelId, name: &str) -> Option<&GuildChannel> {
        self.channels.iter().find(|channel| {
            channel.kind == ChannelKind::Text
                && channel.parent_id == Some(category)
                && channel.name == name
        })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelDirectory, ChannelId, ChannelKind, GuildChannel};

    fn channel(id: u64, name: &str, kind: ChannelKind, parent: Option<u64>) -> GuildChannel {
        GuildChannel { id: ChannelId(id), name: name.to_owned(), kind, parent_id: parent.map(ChannelId) }
    }

    fn directory() -> ChannelDirectory {
        ChannelDirectory::new(vec![
            channel(1, "Research", ChannelKind::Category, None),
            channel(2, "research-alice", ChannelKind::Text, Some(1)),
            channel(3, "Research-Bob", ChannelKind::Text, Some(1)),
            channel(4, "general", ChannelKind::Category, None),
            channel(5, "research-carol", ChannelKind::Text, Some(4)),
            channel(6, "research-dave", ChannelKind::Other, Some(1)),
        ])
    }

    #[test]
    fn category_match_ignores_case() {
        let directory = directory();
        assert_eq!(directory.category("research").map(|category| category.id), Some(ChannelId(1)));
        assert_eq!(directory.category("RESEARCH").map(|category| category.id), Some(ChannelId(1)));
        assert!(directory.category("archive").is_none());
    }

    #[test]
    fn text_channel_match_is_exact_and_scoped_to_category() {
        let directory = directory();

        assert_eq!(
            directory.text_channel_in(ChannelId(1), "research-alice").map(|channel| channel.id),
            Some(ChannelId(2))
        );
        assert!(directory.text_channel_in(ChannelId(1), "research-bob").is_none());
        assert!(directory.text_channel_in(ChannelId(1), "research-carol").is_none());
        assert!(directory.text_channel_in(ChannelId(1), "research-dave").is_none());
    }
}
