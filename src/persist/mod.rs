//! Keeps the durable copy of the store in step with in-memory edits.
//!
//! # Change propagation
//! Registered as a [`SnapshotObserver`]. On every commit each project whose
//! `last_feed_update` lies within the recency window is queued for a full rewrite, and the
//! project index is always queued. The observer only enqueues; a background writer task
//! performs the writes in commit order. Failures are logged and counted, never retried and
//! never reported to the caller that made the edit.
//!
//! A project touched twice inside the window is written twice. A project deleted while a
//! write for it is still queued keeps its record in the backend; only the index stops
//! listing it.
//!
//! # Startup
//! [`PersistenceSynchronizer::restore`] reads the index, loads every record concurrently,
//! drops the ones that are missing or unreadable and installs the rest in one commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};

use crate::db::{load_json, save_json, StateStore, INDEX_KEY};
use crate::models::{Project, ProjectId};
use crate::store::{ProjectStore, Snapshot, SnapshotObserver};

enum WriteJob {
    Project { id: ProjectId, project: Arc<Project> },
    Index(Vec<ProjectId>),
    Flush(oneshot::Sender<()>),
}

/// Durable mirror of a [`ProjectStore`].
pub struct PersistenceSynchronizer {
    backend: Arc<dyn StateStore>,
    window: Duration,
    jobs: mpsc::UnboundedSender<WriteJob>,
    failed_writes: Arc<AtomicU64>,
}

impl PersistenceSynchronizer {
    /// Creates the synchronizer and starts its writer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(backend: Arc<dyn StateStore>, window: Duration) -> Arc<Self> {
        let (jobs, queue) = mpsc::unbounded_channel();
        let failed_writes = Arc::new(AtomicU64::new(0));
        tokio::spawn(run_writer(backend.clone(), queue, failed_writes.clone()));

        Arc::new(Self {
            backend,
            window,
            jobs,
            failed_writes,
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of durable writes that failed since startup.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    /// Rebuilds `store` from the durable index and records.
    ///
    /// Without an index nothing is installed. Returns the number of installed projects.
    pub async fn restore(&self, store: &ProjectStore) -> usize {
        let keys = match load_json::<Vec<String>>(self.backend.as_ref(), INDEX_KEY).await {
            Ok(Some(keys)) => keys,
            Ok(None) => {
                tracing::info!("No project index stored, starting empty");
                return 0;
            }
            Err(e) => {
                tracing::warn!("Project index unreadable, starting empty: {}", e);
                return 0;
            }
        };

        let total = keys.len();
        let loads = keys
            .into_iter()
            .map(|key| load_record(self.backend.as_ref(), key));
        let projects: Vec<(ProjectId, Project)> =
            join_all(loads).await.into_iter().flatten().collect();

        if projects.len() < total {
            tracing::warn!(
                "Dropped {} of {} indexed projects during restore",
                total - projects.len(),
                total
            );
        }

        store.install(projects)
    }

    /// Ids of the projects a commit observed at `now` rewrites.
    pub fn due_projects(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<ProjectId> {
        snapshot
            .iter()
            .filter(|(_, project)| self.is_due(project, now))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Waits until every write queued so far has been attempted.
    pub async fn settle(&self) {
        let (done, finished) = oneshot::channel();
        if self.jobs.send(WriteJob::Flush(done)).is_err() {
            return;
        }
        finished.await.ok();
    }

    fn is_due(&self, project: &Project, now: DateTime<Utc>) -> bool {
        match project.meta().elapsed_since_update(now).to_std() {
            Ok(elapsed) => elapsed <= self.window,
            // Stamp lies in the future.
            Err(_) => true,
        }
    }

    fn enqueue(&self, job: WriteJob) {
        if self.jobs.send(job).is_err() {
            tracing::error!("Error persisting state: writer task has stopped");
        }
    }
}

impl SnapshotObserver for PersistenceSynchronizer {
    fn on_commit(&self, snapshot: &Snapshot) {
        let now = Utc::now();
        let mut queued = 0usize;
        for (id, project) in snapshot.iter() {
            if self.is_due(project, now) {
                self.enqueue(WriteJob::Project {
                    id: *id,
                    project: project.clone(),
                });
                queued += 1;
            }
        }
        self.enqueue(WriteJob::Index(snapshot.ids()));

        tracing::debug!(
            "Queued {} of {} projects for version {}",
            queued,
            snapshot.len(),
            snapshot.version()
        );
    }
}

async fn load_record(backend: &dyn StateStore, key: String) -> Option<(ProjectId, Project)> {
    let id = match key.parse::<ProjectId>() {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Skipping index entry `{}`: {}", key, e);
            return None;
        }
    };

    match load_json::<Project>(backend, &key).await {
        Ok(Some(project)) => Some((id, project)),
        Ok(None) => {
            tracing::warn!("Skipping project {}: no stored record", id);
            None
        }
        Err(e) => {
            tracing::warn!("Skipping project {}: {}", id, e);
            None
        }
    }
}

async fn run_writer(
    backend: Arc<dyn StateStore>,
    mut queue: mpsc::UnboundedReceiver<WriteJob>,
    failed_writes: Arc<AtomicU64>,
) {
    while let Some(job) = queue.recv().await {
        match job {
            WriteJob::Project { id, project } => {
                let key = id.to_string();
                match save_json(backend.as_ref(), &key, project.as_ref()).await {
                    Ok(()) => tracing::debug!("Persisted project {}", id),
                    Err(e) => {
                        failed_writes.fetch_add(1, Ordering::Relaxed);
                        tracing::error!("Error persisting project {}: {}", id, e);
                    }
                }
            }
            WriteJob::Index(ids) => {
                let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
                if let Err(e) = save_json(backend.as_ref(), INDEX_KEY, &keys).await {
                    failed_writes.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("Error persisting project index: {}", e);
                }
            }
            WriteJob::Flush(done) => {
                done.send(()).ok();
            }
        }
    }
    tracing::debug!("Persistence writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStateStore;
    use crate::errors::{AppError, AppResult};
    use crate::models::templates;
    use async_trait::async_trait;
    use uuid::Uuid;

    const WINDOW: Duration = Duration::from_secs(10);

    fn project_updated(ago: chrono::Duration) -> Project {
        let mut config = templates::base_configuration();
        config.meta.last_feed_update = Utc::now() - ago;
        Project::new(templates::feed_template(), config)
    }

    fn stored_index(backend: &MemoryStateStore) -> Vec<String> {
        serde_json::from_str(&backend.get(INDEX_KEY).expect("index stored")).unwrap()
    }

    /// Fails every save for the configured keys.
    struct FlakyStore {
        inner: MemoryStateStore,
        failing: Vec<String>,
    }

    #[async_trait]
    impl StateStore for FlakyStore {
        async fn load(&self, key: &str) -> AppResult<Option<String>> {
            if self.failing.iter().any(|k| k == key) {
                return Err(AppError::Database("disk on fire".to_string()));
            }
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, value: String) -> AppResult<()> {
            if self.failing.iter().any(|k| k == key) {
                return Err(AppError::Database("disk on fire".to_string()));
            }
            self.inner.save(key, value).await
        }
    }

    #[tokio::test]
    async fn test_recency_window_gates_rewrites() {
        let backend = Arc::new(MemoryStateStore::new());
        let sync = PersistenceSynchronizer::spawn(backend.clone(), WINDOW);
        let store = ProjectStore::new();

        let stale = Uuid::new_v4();
        let recent = Uuid::new_v4();
        store.install([
            (stale, project_updated(chrono::Duration::seconds(15))),
            (recent, project_updated(chrono::Duration::seconds(2))),
        ]);
        store.subscribe(sync.clone());

        let fresh = store.create_project();
        sync.settle().await;

        assert!(backend.get(&stale.to_string()).is_none());
        assert!(backend.get(&recent.to_string()).is_some());
        assert!(backend.get(&fresh.to_string()).is_some());

        let mut index = stored_index(&backend);
        index.sort();
        let mut expected = vec![stale.to_string(), recent.to_string(), fresh.to_string()];
        expected.sort();
        assert_eq!(index, expected);
    }

    #[tokio::test]
    async fn test_due_projects() {
        let sync = PersistenceSynchronizer::spawn(Arc::new(MemoryStateStore::new()), WINDOW);
        let store = ProjectStore::new();
        let stale = Uuid::new_v4();
        let recent = Uuid::new_v4();
        let future = Uuid::new_v4();
        store.install([
            (stale, project_updated(chrono::Duration::seconds(15))),
            (recent, project_updated(chrono::Duration::seconds(2))),
            (future, project_updated(chrono::Duration::seconds(-30))),
        ]);

        let mut due = sync.due_projects(&store.snapshot(), Utc::now());
        due.sort();
        let mut expected = vec![recent, future];
        expected.sort();
        assert_eq!(due, expected);
    }

    #[tokio::test]
    async fn test_write_failures_are_isolated() {
        let store = ProjectStore::new();
        let broken = Uuid::new_v4();
        let healthy = Uuid::new_v4();
        store.install([
            (broken, project_updated(chrono::Duration::zero())),
            (healthy, project_updated(chrono::Duration::zero())),
        ]);

        let backend = Arc::new(FlakyStore {
            inner: MemoryStateStore::new(),
            failing: vec![broken.to_string()],
        });
        let sync = PersistenceSynchronizer::spawn(backend.clone(), WINDOW);
        store.subscribe(sync.clone());

        store.add_episode_to_project(broken).unwrap();
        sync.settle().await;

        assert_eq!(sync.failed_writes(), 1);
        assert!(backend.inner.get(&healthy.to_string()).is_some());
        assert!(backend.inner.get(INDEX_KEY).is_some());
        assert_eq!(store.get_project_by_id(broken).unwrap().feed.episodes().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_then_restore_round_trip() {
        let backend = Arc::new(MemoryStateStore::new());
        let sync = PersistenceSynchronizer::spawn(backend.clone(), WINDOW);
        let store = ProjectStore::new();
        store.subscribe(sync.clone());

        let a = store.create_project();
        let b = store.create_project();
        store.add_episode_to_project(a).unwrap();
        let config = templates::base_configuration().with_filename("b.rss");
        store.update_configuration(b, config).unwrap();
        sync.settle().await;

        let restored = ProjectStore::new();
        let reader = PersistenceSynchronizer::spawn(backend.clone(), WINDOW);
        assert_eq!(reader.restore(&restored).await, 2);

        assert_eq!(restored.snapshot().projects(), store.snapshot().projects());
    }

    #[tokio::test]
    async fn test_restore_drops_unloadable_records() {
        let good = Uuid::new_v4();
        let missing = Uuid::new_v4();
        let garbled = Uuid::new_v4();
        let unreadable = Uuid::new_v4();

        let backend = Arc::new(FlakyStore {
            inner: MemoryStateStore::new(),
            failing: vec![unreadable.to_string()],
        });
        let record = project_updated(chrono::Duration::seconds(600));
        backend
            .inner
            .insert(good.to_string(), serde_json::to_string(&record).unwrap());
        backend.inner.insert(garbled.to_string(), "{\"feed\":");
        let index = vec![
            good.to_string(),
            missing.to_string(),
            garbled.to_string(),
            unreadable.to_string(),
            "not-a-uuid".to_string(),
        ];
        backend
            .inner
            .insert(INDEX_KEY, serde_json::to_string(&index).unwrap());

        let store = ProjectStore::new();
        let sync = PersistenceSynchronizer::spawn(backend, WINDOW);

        assert_eq!(sync.restore(&store).await, 1);
        assert_eq!(store.project_ids(), vec![good]);
        assert_eq!(*store.get_project_by_id(good).unwrap(), record);
    }

    #[tokio::test]
    async fn test_restore_without_index_installs_nothing() {
        let store = ProjectStore::new();
        let sync = PersistenceSynchronizer::spawn(Arc::new(MemoryStateStore::new()), WINDOW);

        assert_eq!(sync.restore(&store).await, 0);
        assert_eq!(store.snapshot().version(), 0);
    }
}
