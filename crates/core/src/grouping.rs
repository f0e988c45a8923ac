use std::collections::HashMap;

use crate::domain::row::ResearchRow;

pub const CHANNEL_KEY_PREFIX: &str = "research-";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelGroup {
    pub channel_key: String,
    pub rows: Vec<ResearchRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadGroup {
    pub key: String,
    pub rows: Vec<ResearchRow>,
}

impl ThreadGroup {
    /// The row whose Identity and Deadline the thread displays.
    pub fn first_row(&self) -> &ResearchRow {
        // Groups are only ever created together with their first row.
        &self.rows[0]
    }
}

/// Derives the channel a person's rows are posted to.
///
/// `None` when the person is blank. Letters are lowercased and everything
/// outside `a-z` is dropped, so `"Jane_Doe 2"` maps to `research-janedoe`.
pub fn channel_key(person: &str) -> Option<String> {
    let person = person.trim();
    if person.is_empty() {
        return None;
    }

    let normalized: String =
        person.to_lowercase().chars().filter(|ch| ch.is_ascii_lowercase()).collect();
    Some(format!("{CHANNEL_KEY_PREFIX}{normalized}"))
}

pub fn thread_key(identity: &str, deadline: &str) -> Option<String> {
    let (identity, deadline) = (identity.trim(), deadline.trim());
    if identity.is_empty() || deadline.is_empty() {
        return None;
    }
    Some(format!("{identity}-{deadline}"))
}

/// Buckets rows by owner channel, keeping first-seen group order and input
/// row order. Rows without an owner are dropped.
pub fn group_by_channel(rows: impl IntoIterator<Item = ResearchRow>) -> Vec<ChannelGroup> {
    let mut buckets = OrderedBuckets::default();
    for row in rows {
        let Some(key) = row.owner().and_then(channel_key) else {
            continue;
        };
        buckets.push(key, row);
    }

    buckets.into_groups().map(|(channel_key, rows)| ChannelGroup { channel_key, rows }).collect()
}

/// Buckets one channel's rows by Identity and Deadline. Rows missing either
/// are dropped.
pub fn group_by_thread<'a>(rows: impl IntoIterator<Item = &'a ResearchRow>) -> Vec<ThreadGroup> {
    let mut buckets = OrderedBuckets::default();
    for row in rows {
        let Some(key) = thread_key(&row.identity, &row.deadline) else {
            continue;
        };
        buckets.push(key, row.clone());
    }

    buckets.into_groups().map(|(key, rows)| ThreadGroup { key, rows }).collect()
}

#[derive(Default)]
struct OrderedBuckets {
    positions: HashMap<String, usize>,
    groups: Vec<(String, Vec<ResearchRow>)>,
}

impl OrderedBuckets {
    fn push(&mut self, key: String, row: ResearchRow) {
        match self.positions.get(&key) {
            Some(&index) => self.groups[index].1.push(row),
            None => {
                self.positions.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![row]));
            }
        }
    }

    fn into_groups(self) -> impl Iterator<Item = (String, Vec<ResearchRow>)> {
        self.groups.into_iter()
    }
}
