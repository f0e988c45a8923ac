use std::sync::Arc;

use threadloom_core::{PlannedThread, ThreadPlan};
use tracing::{info, warn};

use crate::{
    events::EventContext,
    platform::{ChannelDirectory, ChannelId, GuildId, PlatformError, ResearchPlatform, ThreadRequest},
};

const THREAD_REASON: &str = "Auto-created from CSV upload";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    pub research_category: String,
    pub auto_archive_minutes: u16,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { research_category: "research".to_owned(), auto_archive_minutes: 1440 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub threads_created: usize,
    pub messages_sent: usize,
    pub rejected_threads: usize,
    pub skipped_channels: Vec<SkippedChannel>,
    pub failures: Vec<DispatchFailure>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedChannel {
    pub channel_key: String,
    pub reason: LookupMiss,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupMiss {
    CategoryMissing { category: String },
    ChannelMissing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchFailure {
    pub channel_key: String,
    pub identity: String,
    pub deadline: String,
    pub stage: DispatchStage,
    pub error: PlatformError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStage {
    CreateThread,
    SendMessage { chunk: usize },
}

/// Turns a [`ThreadPlan`] into platform calls, strictly one at a time.
///
/// A failure inside one thread group is recorded and logged, and the
/// remaining groups are still attempted. Only failing to list the guild's
/// channels aborts the whole upload.
pub struct ThreadDispatcher {
    platform: Arc<dyn ResearchPlatform>,
    settings: DispatchSettings,
}

impl ThreadDispatcher {
    pub fn new(platform: Arc<dyn ResearchPlatform>, settings: DispatchSettings) -> Self {
        Self { platform, settings }
    }

    pub async fn dispatch(
        &self,
        guild_id: GuildId,
        plan: &ThreadPlan,
        ctx: &EventContext,
    ) -> Result<DispatchReport, PlatformError> {
        let mut report = DispatchReport {
            rejected_threads: plan.channels.iter().map(|channel| channel.rejected.len()).sum(),
            ..DispatchReport::default()
        };
        for channel in &plan.channels {
            for rejected in &channel.rejected {
                warn!(
                    event_name = "pipeline.thread.rejected",
                    correlation_id = %ctx.correlation_id,
                    channel = %channel.channel_key,
                    identity = %rejected.identity,
                    deadline = %rejected.deadline,
                    rows = rejected.row_count,
                    reason = %rejected.reason,
                    "thread group skipped: deadline is not usable"
                );
            }
        }

        if plan.is_empty() {
            return Ok(report);
        }

        let directory = ChannelDirectory::new(self.platform.guild_channels(guild_id).await?);
        let Some(category) = directory.category(&self.settings.research_category) else {
            warn!(
                event_name = "pipeline.channel.category_missing",
                correlation_id = %ctx.correlation_id,
                category = %self.settings.research_category,
                guild_channels = directory.len(),
                "research category not found; skipping every channel group"
            );
            report.skipped_channels = plan
                .channels
                .iter()
                .map(|channel| SkippedChannel {
                    channel_key: channel.channel_key.clone(),
                    reason: LookupMiss::CategoryMissing {
                        category: self.settings.research_category.clone(),
                    },
                })
                .collect();
            return Ok(report);
        };

        for channel in &plan.channels {
            info!(
                event_name = "pipeline.channel.lookup",
                correlation_id = %ctx.correlation_id,
                channel = %channel.channel_key,
                "looking for channel"
            );

            let Some(target) = directory.text_channel_in(category.id, &channel.channel_key) else {
                warn!(
                    event_name = "pipeline.channel.missing",
                    correlation_id = %ctx.correlation_id,
                    channel = %channel.channel_key,
                    category = %category.name,
                    "channel not found under research category; skipping"
                );
                report.skipped_channels.push(SkippedChannel {
                    channel_key: channel.channel_key.clone(),
                    reason: LookupMiss::ChannelMissing,
                });
                continue;
            };

            for thread in &channel.threads {
                self.open_thread(target.id, &channel.channel_key, thread, ctx, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn open_thread(
        &self,
        channel_id: ChannelId,
        channel_key: &str,
        thread: &PlannedThread,
        ctx: &EventContext,
        report: &mut DispatchReport,
    ) {
        let request = ThreadRequest {
            name: thread.title.clone(),
            auto_archive_minutes: self.settings.auto_archive_minutes,
            reason: THREAD_REASON.to_owned(),
        };

        let created = match self.platform.create_thread(channel_id, &request).await {
            Ok(created) => created,
            Err(error) => {
                record_failure(report, channel_key, thread, DispatchStage::CreateThread, error, ctx);
                return;
            }
        };
        report.threads_created += 1;
        info!(
            event_name = "pipeline.thread.created",
            correlation_id = %ctx.correlation_id,
            channel = %channel_key,
            thread_id = created.id.0,
            title = %created.name,
            chunks = thread.messages.len(),
            "thread created"
        );

        for (chunk, content) in thread.messages.iter().enumerate() {
            if let Err(error) = self.platform.send_message(created.id, content).await {
                record_failure(
                    report,
                    channel_key,
                    thread,
                    DispatchStage::SendMessage { chunk },
                    error,
                    ctx,
                );
                return;
            }
            report.messages_sent += 1;
        }
    }
}

fn record_failure(
    report: &mut DispatchReport,
    channel_key: &str,
    thread: &PlannedThread,
    stage: DispatchStage,
    error: PlatformError,
    ctx: &EventContext,
) {
    warn!(
        event_name = "pipeline.thread.dispatch_failed",
        correlation_id = %ctx.correlation_id,
        channel = %channel_key,
        identity = %thread.identity,
        deadline = %thread.deadline,
        stage = ?stage,
        error = %error,
        "failed to create thread or send its messages; continuing with next group"
    );
    report.failures.push(DispatchFailure {
        channel_key: channel_key.to_owned(),
        identity: thread.identity.clone(),
        deadline: thread.deadline.clone(),
        stage,
        error,
    });
}
