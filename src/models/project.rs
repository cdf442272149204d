//! Project model: a feed document paired with its editable configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::FeedDocument;

/// Stable identifier of a project; generated once and never reused.
pub type ProjectId = Uuid;

/// Output file settings of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedSettings {
    pub filename: String,
}

/// External source the feed was imported from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    pub feed_url: String,
}

/// Bookkeeping maintained by the store, not by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    /// Instant of the most recent feed-affecting mutation
    pub last_feed_update: DateTime<Utc>,
    /// True while local edits have not been reconciled with an external source
    pub feed_is_dirty: bool,
}

impl ProjectMeta {
    /// Stamps a feed-affecting mutation.
    pub fn touch(&mut self, now: DateTime<Utc>, dirty: bool) {
        self.last_feed_update = now;
        self.feed_is_dirty = dirty;
    }

    /// Time elapsed since the last feed update; negative if the stamp is in the future.
    pub fn elapsed_since_update(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.last_feed_update)
    }
}

/// User-controlled project settings plus store-maintained meta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfiguration {
    pub feed: FeedSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
    pub meta: ProjectMeta,
}

impl ProjectConfiguration {
    /// Returns a copy with the output filename replaced.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.feed.filename = filename.into();
        self
    }

    /// Returns a copy remembering where the feed was imported from.
    pub fn with_remote(mut self, feed_url: impl Into<String>) -> Self {
        self.remote = Some(RemoteSettings {
            feed_url: feed_url.into(),
        });
        self
    }
}

/// A feed-editing unit. This is also the durable record stored under the project id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub feed: FeedDocument,
    pub configuration: ProjectConfiguration,
}

impl Project {
    pub fn new(feed: FeedDocument, configuration: ProjectConfiguration) -> Self {
        Self {
            feed,
            configuration,
        }
    }

    pub fn meta(&self) -> &ProjectMeta {
        &self.configuration.meta
    }
}
