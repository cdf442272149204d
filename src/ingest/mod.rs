//! Feed ingestion: turns fetched or supplied feed text into projects.
//!
//! Parsing always happens before the store is touched, so a malformed feed never leaves a
//! partial mutation behind. URL variants read the store again after the fetch resumes and
//! apply their change on top of whatever happened in the meantime.

mod fetcher;

pub use fetcher::*;

use std::sync::Arc;

use chrono::Utc;

use crate::errors::AppResult;
use crate::feed::{FeedParser, RssFeedParser};
use crate::models::{templates, FeedDocument, Project, ProjectConfiguration, ProjectId};
use crate::store::ProjectStore;

/// Creates and refreshes projects from external feed sources.
#[derive(Clone)]
pub struct FeedIngestor {
    store: Arc<ProjectStore>,
    fetcher: Arc<dyn FeedFetcher>,
    parser: Arc<dyn FeedParser>,
}

impl FeedIngestor {
    pub fn new(store: Arc<ProjectStore>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            store,
            fetcher,
            parser: Arc::new(RssFeedParser),
        }
    }

    /// Replaces the feed converter.
    pub fn with_parser(mut self, parser: Arc<dyn FeedParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Downloads `url` and creates a project from it.
    ///
    /// Returns `Ok(None)` without touching the store when the fetch yields nothing.
    pub async fn init_project_from_url(&self, url: &str) -> AppResult<Option<ProjectId>> {
        let Some(text) = self.fetcher.fetch(url).await else {
            tracing::info!("No payload from {}, nothing imported", url);
            return Ok(None);
        };

        let feed = self.parser.parse(&text)?;
        let configuration = templates::base_configuration()
            .with_filename(filename_from_url(url))
            .with_remote(url);
        let id = self.insert_imported(feed, configuration);
        tracing::info!("Imported project {} from {}", id, url);
        Ok(Some(id))
    }

    /// Creates a project from feed text supplied directly.
    pub fn init_project_from_file_contents(&self, text: &str) -> AppResult<ProjectId> {
        let feed = self.parser.parse(text)?;
        let id = self.insert_imported(feed, templates::base_configuration());
        tracing::info!("Imported project {} from file contents", id);
        Ok(id)
    }

    /// Downloads `url` and replaces the feed of an existing project with it.
    ///
    /// Returns `Ok(false)` without touching the store when the fetch yields nothing.
    pub async fn patch_feed_from_url(&self, id: ProjectId, url: &str) -> AppResult<bool> {
        self.store.get_project_by_id(id)?;

        let Some(text) = self.fetcher.fetch(url).await else {
            tracing::info!("No payload from {}, project {} left as is", url, id);
            return Ok(false);
        };

        let feed = self.parser.parse(&text)?;
        let source = url.to_string();
        self.apply_external_feed(id, feed, Some(source))?;
        tracing::info!("Refreshed project {} from {}", id, url);
        Ok(true)
    }

    /// Replaces the feed of an existing project with feed text supplied directly.
    pub fn patch_feed_from_file_contents(&self, id: ProjectId, text: &str) -> AppResult<()> {
        let feed = self.parser.parse(text)?;
        self.apply_external_feed(id, feed, None)?;
        tracing::info!("Refreshed project {} from file contents", id);
        Ok(())
    }

    fn insert_imported(
        &self,
        feed: FeedDocument,
        mut configuration: ProjectConfiguration,
    ) -> ProjectId {
        configuration.meta.last_feed_update = Utc::now();
        self.store.insert_project(Project::new(feed, configuration))
    }

    /// Externally sourced replacement: stamps the update and clears the dirty flag.
    fn apply_external_feed(
        &self,
        id: ProjectId,
        feed: FeedDocument,
        source: Option<String>,
    ) -> AppResult<()> {
        let now = Utc::now();
        self.store.modify_project("patch_feed", id, move |project| {
            project.feed = feed;
            if let Some(feed_url) = source {
                project.configuration = project.configuration.clone().with_remote(feed_url);
            }
            project.configuration.meta.touch(now, false);
        })
    }
}

/// Output filename derived from the last path segment of `url`.
pub fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => templates::DEFAULT_FEED_FILENAME.to_string(),
    }
}
