//! Feed document model: one channel owning an ordered list of episodes.

use serde::{Deserialize, Serialize};

/// Structured representation of a podcast feed.
///
/// A document always owns exactly one channel; multi-channel input is rejected by the
/// parser, so nothing downstream ever indexes into a list of channels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    pub channel: Channel,
}

impl FeedDocument {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.channel.items
    }

    pub fn episodes_mut(&mut self) -> &mut Vec<Episode> {
        &mut self.channel.items
    }
}

/// Channel metadata plus the episode list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// RFC 2822 text, as it appears in the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    /// RFC 2822 text; stamped on every local feed edit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_build_date: Option<String>,
    /// Newest first
    #[serde(default)]
    pub items: Vec<Episode>,
}

/// Episode identity as carried by `<guid>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Guid {
    pub value: String,
    #[serde(default)]
    pub is_perma_link: bool,
}

impl Guid {
    pub fn new(value: impl Into<String>, is_perma_link: bool) -> Self {
        Self {
            value: value.into(),
            is_perma_link,
        }
    }
}

/// Media attachment of an episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Enclosure {
    pub url: String,
    #[serde(default)]
    pub length: u64,
    pub mime_type: String,
}

/// A single feed entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub guid: Guid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<Enclosure>,
    /// itunes:duration, kept verbatim (`HH:MM:SS` or seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
}

impl Episode {
    /// Creates an episode with only identity and title set.
    pub fn new(guid: Guid, title: impl Into<String>) -> Self {
        Self {
            guid,
            title: title.into(),
            description: String::new(),
            link: None,
            pub_date: None,
            enclosure: None,
            duration: None,
            explicit: None,
            episode_number: None,
        }
    }

    pub fn guid_text(&self) -> &str {
        &self.guid.value
    }
}
