//! Pure planning step between a parsed sheet and the platform calls.
//!
//! A [`ThreadPlan`] lists, per owner channel, every thread the upload should
//! open and the exact messages to post into it. The live dispatcher walks it
//! in order; the CLI renders it without touching the network.

use serde::Serialize;

use crate::{
    domain::row::ResearchRow,
    format::{render_thread, DeadlineError},
    grouping::{group_by_channel, group_by_thread},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ThreadPlan {
    pub channels: Vec<PlannedChannel>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedChannel {
    pub channel_key: String,
    pub threads: Vec<PlannedThread>,
    pub rejected: Vec<RejectedThread>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedThread {
    pub title: String,
    pub identity: String,
    pub deadline: String,
    pub row_count: usize,
    pub messages: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RejectedThread {
    pub identity: String,
    pub deadline: String,
    pub row_count: usize,
    pub reason: String,
}

impl ThreadPlan {
    pub fn build(uploader: &str, rows: Vec<ResearchRow>, rows_per_message: usize) -> Self {
        let channels = group_by_channel(rows)
            .into_iter()
            .map(|channel| {
                let mut threads = Vec::new();
                let mut rejected = Vec::new();

                for group in group_by_thread(&channel.rows) {
                    let first = group.first_row();
                    match render_thread(uploader, &group, rows_per_message) {
                        Ok(rendered) => threads.push(PlannedThread {
                            title: rendered.title,
                            identity: rendered.identity,
                            deadline: first.deadline.clone(),
                            row_count: group.rows.len(),
                            messages: rendered.messages,
                        }),
                        Err(error) => {
                            rejected.push(RejectedThread::new(&group.rows, first, &error))
                        }
                    }
                }

                PlannedChannel { channel_key: channel.channel_key, threads, rejected }
            })
            .collect();

        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn thread_count(&self) -> usize {
        self.channels.iter().map(|channel| channel.threads.len()).sum()
    }

    pub fn message_count(&self) -> usize {
        self.channels
            .iter()
            .flat_map(|channel| &channel.threads)
            .map(|thread| thread.messages.len())
            .sum()
    }
}

impl RejectedThread {
    fn new(rows: &[ResearchRow], first: &ResearchRow, error: &DeadlineError) -> Self {
        Self {
            identity: first.identity.clone(),
            deadline: first.deadline.clone(),
            row_count: rows.len(),
            reason: error.to_string(),
        }
    }
}
