use std::sync::Arc;

use async_trait::async_trait;
use threadloom_core::{parse_rows, ApplicationError, ThreadPlan};
use tracing::info;

use crate::{
    dispatch::ThreadDispatcher,
    events::{Attachment, EventContext, EventHandler, HandlerResult, IgnoreReason, MessageCreateEvent},
    fetch::AttachmentFetcher,
    platform::GuildId,
};

const CSV_SUFFIX: &str = ".csv";

/// Handles a message that mentions the bot with a CSV sheet attached.
///
/// Fetching and parsing happen before any thread is opened, so a broken
/// sheet leaves the guild untouched.
pub struct UploadHandler {
    fetcher: Arc<dyn AttachmentFetcher>,
    dispatcher: ThreadDispatcher,
    rows_per_message: usize,
}

impl UploadHandler {
    pub fn new(
        fetcher: Arc<dyn AttachmentFetcher>,
        dispatcher: ThreadDispatcher,
        rows_per_message: usize,
    ) -> Self {
        Self { fetcher, dispatcher, rows_per_message }
    }
}

#[async_trait]
impl EventHandler for UploadHandler {
    async fn handle(
        &self,
        event: &MessageCreateEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, ApplicationError> {
        let (guild_id, attachment) = match accept_upload(event) {
            Ok(accepted) => accepted,
            Err(reason) => return Ok(HandlerResult::Ignored(reason)),
        };

        info!(
            event_name = "ingress.discord.upload_received",
            correlation_id = %ctx.correlation_id,
            guild_id = guild_id.0,
            channel_id = event.channel_id.0,
            uploader = %event.author.name,
            filename = %attachment.filename,
            "received csv upload"
        );

        let payload = self
            .fetcher
            .fetch_text(&attachment.url)
            .await
            .map_err(|error| ApplicationError::Fetch(error.to_string()))?;
        let rows = parse_rows(&payload)?;
        let row_count = rows.len();

        let plan = ThreadPlan::build(&event.author.mention(), rows, self.rows_per_message);
        info!(
            event_name = "pipeline.upload.grouped",
            correlation_id = %ctx.correlation_id,
            rows = row_count,
            channels = plan.channels.len(),
            threads = plan.thread_count(),
            "upload parsed and grouped"
        );

        let report = self
            .dispatcher
            .dispatch(guild_id, &plan, ctx)
            .await
            .map_err(|error| ApplicationError::Integration(error.to_string()))?;

        info!(
            event_name = "pipeline.upload.completed",
            correlation_id = %ctx.correlation_id,
            threads_created = report.threads_created,
            messages_sent = report.messages_sent,
            channels_skipped = report.skipped_channels.len(),
            groups_rejected = report.rejected_threads,
            failures = report.failures.len(),
            "upload dispatch finished"
        );

        Ok(HandlerResult::Processed(report))
    }
}

/// Only the first attachment is considered, matching how uploads are posted.
fn accept_upload(event: &MessageCreateEvent) -> Result<(GuildId, &Attachment), IgnoreReason> {
    if event.author.bot {
        return Err(IgnoreReason::FromBot);
    }
    let Some(guild_id) = event.guild_id else {
        return Err(IgnoreReason::OutsideGuild);
    };
    if !event.mentions_bot {
        return Err(IgnoreReason::NotMentioned);
    }
    let Some(attachment) = event.attachments.first() else {
        return Err(IgnoreReason::NoAttachment);
    };
    if !attachment.filename.ends_with(CSV_SUFFIX) {
        return Err(IgnoreReason::NotCsv);
    }
    Ok((guild_id, attachment))
}
