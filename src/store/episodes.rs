//! Episode list edits scoped to one project.
//!
//! These edits leave `last_feed_update` and `feed_is_dirty` alone; only whole-feed
//! replacement stamps the meta block.

use crate::errors::AppResult;
use crate::models::{templates, ProjectId};

use super::ProjectStore;

impl ProjectStore {
    /// Prepends a fresh template episode (newest first) and returns its GUID.
    pub fn add_episode_to_project(&self, id: ProjectId) -> AppResult<String> {
        let episode = templates::episode_template();
        let guid = episode.guid.value.clone();
        self.modify_project("add_episode", id, move |project| {
            project.feed.episodes_mut().insert(0, episode);
        })?;
        tracing::debug!("Added episode {} to project {}", guid, id);
        Ok(guid)
    }

    /// Removes every episode whose GUID text equals `episode_guid`.
    ///
    /// Returns how many episodes were removed; zero matches still commits.
    pub fn delete_episode_from_project(
        &self,
        id: ProjectId,
        episode_guid: &str,
    ) -> AppResult<usize> {
        let removed = self.modify_project("delete_episode", id, |project| {
            let items = project.feed.episodes_mut();
            let before = items.len();
            items.retain(|episode| episode.guid_text() != episode_guid);
            before - items.len()
        })?;
        tracing::debug!(
            "Removed {} episode(s) with guid {} from project {}",
            removed,
            episode_guid,
            id
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{templates, Episode, Guid};
    use crate::store::ProjectStore;
    use uuid::Uuid;

    fn episode(guid: &str) -> Episode {
        Episode::new(Guid::new(guid, false), format!("episode {guid}"))
    }

    fn store_with_episodes(guids: &[&str]) -> (ProjectStore, uuid::Uuid) {
        let store = ProjectStore::new();
        let id = store.create_project();
        let mut feed = templates::feed_template();
        feed.channel.items = guids.iter().map(|g| episode(g)).collect();
        store.update_feed(id, feed).unwrap();
        (store, id)
    }

    fn guids(store: &ProjectStore, id: Uuid) -> Vec<String> {
        store
            .get_project_by_id(id)
            .unwrap()
            .feed
            .episodes()
            .iter()
            .map(|e| e.guid_text().to_string())
            .collect()
    }

    #[test]
    fn test_add_episode_prepends() {
        let (store, id) = store_with_episodes(&["a", "b"]);
        let new_guid = store.add_episode_to_project(id).unwrap();
        assert_eq!(guids(&store, id), vec![new_guid, "a".into(), "b".into()]);
    }

    #[test]
    fn test_add_episode_to_empty_feed() {
        let store = ProjectStore::new();
        let id = store.create_project();
        let guid = store.add_episode_to_project(id).unwrap();
        assert_eq!(guids(&store, id), vec![guid]);
    }

    #[test]
    fn test_delete_episode_removes_all_matches() {
        let (store, id) = store_with_episodes(&["x", "y", "x"]);
        assert_eq!(store.delete_episode_from_project(id, "x").unwrap(), 2);
        assert_eq!(guids(&store, id), vec!["y".to_string()]);
    }

    #[test]
    fn test_episode_edits_leave_meta_untouched() {
        let (store, id) = store_with_episodes(&["a"]);
        let mut config = store.get_project_by_id(id).unwrap().configuration.clone();
        config.meta.feed_is_dirty = false;
        store.update_configuration(id, config).unwrap();
        let before = store.get_project_by_id(id).unwrap().meta().clone();

        store.add_episode_to_project(id).unwrap();
        store.delete_episode_from_project(id, "a").unwrap();

        assert_eq!(store.get_project_by_id(id).unwrap().meta(), &before);
    }

    #[test]
    fn test_episode_edits_on_unknown_project_fail() {
        let store = ProjectStore::new();
        let missing = Uuid::new_v4();
        assert!(store.add_episode_to_project(missing).unwrap_err().is_not_found());
        assert!(store
            .delete_episode_from_project(missing, "x")
            .unwrap_err()
            .is_not_found());
    }
}
