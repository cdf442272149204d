//! Seed records used when a project or episode is created from scratch.

use chrono::Utc;
use uuid::Uuid;

use super::{
    Channel, Episode, FeedDocument, FeedSettings, Guid, ProjectConfiguration, ProjectMeta,
};

/// Output filename used when nothing better can be derived.
pub const DEFAULT_FEED_FILENAME: &str = "feed.xml";

const TEMPLATE_FEED_TITLE: &str = "New podcast";
const TEMPLATE_FEED_DESCRIPTION: &str = "Describe your podcast here";
const TEMPLATE_EPISODE_TITLE: &str = "New episode";

/// Seed feed for a project created from scratch.
pub fn feed_template() -> FeedDocument {
    FeedDocument::new(Channel {
        title: TEMPLATE_FEED_TITLE.to_string(),
        description: TEMPLATE_FEED_DESCRIPTION.to_string(),
        language: Some("en".to_string()),
        explicit: Some(false),
        ..Channel::default()
    })
}

/// Fresh episode with its own identity. Every call yields a distinct GUID.
pub fn episode_template() -> Episode {
    let mut episode = Episode::new(
        Guid::new(Uuid::new_v4().to_string(), false),
        TEMPLATE_EPISODE_TITLE,
    );
    episode.pub_date = Some(Utc::now().to_rfc2822());
    episode.explicit = Some(false);
    episode
}

/// Base configuration merged into every new project.
///
/// `last_feed_update` is the construction instant so a new project falls inside the
/// persistence window of the commit that inserts it.
pub fn base_configuration() -> ProjectConfiguration {
    ProjectConfiguration {
        feed: FeedSettings {
            filename: DEFAULT_FEED_FILENAME.to_string(),
        },
        remote: None,
        meta: ProjectMeta {
            last_feed_update: Utc::now(),
            feed_is_dirty: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_template_has_fresh_identity() {
        let first = episode_template();
        let second = episode_template();
        assert_ne!(first.guid, second.guid);
        assert!(!first.guid.is_perma_link);
        assert!(first.pub_date.is_some());
    }

    #[test]
    fn test_feed_template_has_no_episodes() {
        let feed = feed_template();
        assert!(feed.episodes().is_empty());
        assert_eq!(feed.channel.title, TEMPLATE_FEED_TITLE);
    }
}
