//! Feedstore
//!
//! In-memory project store and persistence core for a podcast feed editor: projects pair a
//! parsed feed with editable configuration, every edit publishes a new immutable snapshot,
//! and a synchronizer mirrors recently touched projects to SQLite.

pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod ingest;
pub mod models;
pub mod persist;
pub mod store;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::Config;
pub use db::{MemoryStateStore, SqliteStateStore, StateStore};
pub use errors::{AppError, AppResult};
pub use feed::{parse_feed, FeedParser, RssFeedParser};
pub use ingest::{FeedFetcher, FeedIngestor, HttpFetcher};
pub use models::{
    Channel, Enclosure, Episode, FeedDocument, Guid, Project, ProjectConfiguration, ProjectId,
    ProjectMeta,
};
pub use persist::PersistenceSynchronizer;
pub use store::{ProjectStore, Snapshot, SnapshotObserver, SubscriptionId};

/// Fully wired store, ingestion and persistence.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<ProjectStore>,
    pub ingestor: FeedIngestor,
    pub synchronizer: Arc<PersistenceSynchronizer>,
}

impl AppState {
    /// Opens the configured database, restores the saved projects and starts persistence.
    pub async fn bootstrap(config: Config) -> AppResult<Self> {
        tracing::info!("Starting feed store");
        tracing::info!("Database path: {:?}", config.db_path);
        tracing::info!("Persist window: {:?}", config.persist_window);

        let pool = db::init_database(&config.db_path).await?;
        let backend = Arc::new(SqliteStateStore::new(pool));
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);

        Ok(Self::with_backends(config, backend, fetcher).await)
    }

    /// Wires the core against caller-supplied collaborators.
    pub async fn with_backends(
        config: Config,
        backend: Arc<dyn StateStore>,
        fetcher: Arc<dyn FeedFetcher>,
    ) -> Self {
        let store = Arc::new(ProjectStore::new());
        let synchronizer = PersistenceSynchronizer::spawn(backend, config.persist_window);

        // Subscribed before the restore so the install commit rewrites the index without
        // the entries that failed to load.
        store.subscribe(synchronizer.clone());
        let restored = synchronizer.restore(&store).await;
        tracing::info!("Restored {} projects", restored);

        let ingestor = FeedIngestor::new(store.clone(), fetcher);

        Self {
            config: Arc::new(config),
            store,
            ingestor,
            synchronizer,
        }
    }

    /// Waits for queued durable writes to be attempted.
    pub async fn shutdown(&self) {
        self.synchronizer.settle().await;
        tracing::info!(
            "Feed store stopped, {} failed writes",
            self.synchronizer.failed_writes()
        );
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Returns `false` if a subscriber was
/// already installed.
pub fn init_tracing(config: &Config) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    result.is_ok()
}
