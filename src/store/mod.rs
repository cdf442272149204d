//! Authoritative in-memory project store.
//!
//! Every mutation builds a complete new [`Snapshot`] and swaps it in as a whole. Snapshots
//! share untouched projects through `Arc`, so a mutation copies the map spine and at most
//! the one project it edits.
//!
//! Mutations are serialised by a commit lock. Observers run synchronously after the new
//! snapshot is published and while the commit lock is still held, so they see snapshots
//! in commit order. Observers may read the store but must not mutate it.

mod episodes;

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{templates, FeedDocument, Project, ProjectConfiguration, ProjectId};

/// Mapping held by one snapshot.
pub type ProjectMap = BTreeMap<ProjectId, Arc<Project>>;

/// One immutable, fully formed state of the whole project mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    version: u64,
    projects: Arc<ProjectMap>,
}

impl Snapshot {
    /// Monotonic commit counter; the empty initial snapshot is version 0.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn projects(&self) -> &ProjectMap {
        &self.projects
    }

    pub fn get(&self, id: &ProjectId) -> Option<&Arc<Project>> {
        self.projects.get(id)
    }

    pub fn contains(&self, id: &ProjectId) -> bool {
        self.projects.contains_key(id)
    }

    pub fn ids(&self) -> Vec<ProjectId> {
        self.projects.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProjectId, &Arc<Project>)> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Receives every committed snapshot.
pub trait SnapshotObserver: Send + Sync {
    fn on_commit(&self, snapshot: &Snapshot);
}

impl<F> SnapshotObserver for F
where
    F: Fn(&Snapshot) + Send + Sync,
{
    fn on_commit(&self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Handle returned by [`ProjectStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// State container for all projects.
#[derive(Default)]
pub struct ProjectStore {
    current: RwLock<Snapshot>,
    commit_lock: Mutex<()>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn SnapshotObserver>)>>,
    next_subscription: AtomicU64,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.snapshot().ids()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Registers an observer invoked after every commit.
    pub fn subscribe(&self, observer: Arc<dyn SnapshotObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, observer));
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Creates a project from the seed feed and base configuration.
    pub fn create_project(&self) -> ProjectId {
        let project = Project::new(templates::feed_template(), templates::base_configuration());
        let id = self.insert_project(project);
        tracing::info!("Created project {}", id);
        id
    }

    /// Inserts a project under a freshly generated id.
    pub fn insert_project(&self, project: Project) -> ProjectId {
        let project = Arc::new(project);
        self.commit("insert_project", move |projects| {
            let id = loop {
                let candidate = Uuid::new_v4();
                if !projects.contains_key(&candidate) {
                    break candidate;
                }
            };
            projects.insert(id, project);
            Ok::<_, Infallible>(id)
        })
        .unwrap_or_else(|never| match never {})
    }

    /// Looks up a project, failing with `NotFound` when absent.
    pub fn get_project_by_id(&self, id: ProjectId) -> AppResult<Arc<Project>> {
        self.snapshot()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::project_not_found(id))
    }

    /// Removes a project. Deleting an absent id commits nothing and notifies nobody.
    ///
    /// Returns whether a project was removed.
    pub fn delete_project(&self, id: ProjectId) -> bool {
        let removed = self
            .commit_when("delete_project", |projects| {
                let removed = projects.remove(&id).is_some();
                Ok::<_, Infallible>((removed, removed))
            })
            .unwrap_or_else(|never| match never {});
        if removed {
            tracing::info!("Deleted project {}", id);
        } else {
            tracing::debug!("Delete of unknown project {} ignored", id);
        }
        removed
    }

    /// Replaces a project's feed as a local edit.
    ///
    /// Stamps the channel's last build date and `last_feed_update` with the current time
    /// and marks the feed dirty, all within the same commit.
    pub fn update_feed(&self, id: ProjectId, feed: FeedDocument) -> AppResult<()> {
        let now = Utc::now();
        self.modify_project("update_feed", id, move |project| {
            project.feed = feed;
            project.feed.channel.last_build_date = Some(now.to_rfc2822());
            project.configuration.meta.touch(now, true);
        })
    }

    /// Replaces a project's configuration wholesale, meta included.
    pub fn update_configuration(
        &self,
        id: ProjectId,
        configuration: ProjectConfiguration,
    ) -> AppResult<()> {
        self.modify_project("update_configuration", id, move |project| {
            project.configuration = configuration;
        })
    }

    /// Installs a complete mapping in one commit, replacing whatever was there.
    pub fn install(&self, projects: impl IntoIterator<Item = (ProjectId, Project)>) -> usize {
        let map: ProjectMap = projects
            .into_iter()
            .map(|(id, project)| (id, Arc::new(project)))
            .collect();
        let count = map.len();
        self.commit("install", move |projects| {
            *projects = map;
            Ok::<_, Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
        tracing::info!("Installed {} projects", count);
        count
    }

    /// Applies `edit` to a private copy of one project and commits it.
    pub(crate) fn modify_project<T>(
        &self,
        op: &'static str,
        id: ProjectId,
        edit: impl FnOnce(&mut Project) -> T,
    ) -> AppResult<T> {
        self.commit(op, move |projects| {
            let entry = projects
                .get_mut(&id)
                .ok_or_else(|| AppError::project_not_found(id))?;
            Ok(edit(Arc::make_mut(entry)))
        })
    }

    fn commit<T, E>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut ProjectMap) -> Result<T, E>,
    ) -> Result<T, E> {
        self.commit_when(op, move |projects| mutate(projects).map(|value| (value, true)))
    }

    /// Runs `mutate` on a copy of the current mapping. The copy is published only when the
    /// closure succeeds and reports a change; errors leave the store untouched.
    fn commit_when<T, E>(
        &self,
        op: &'static str,
        mutate: impl FnOnce(&mut ProjectMap) -> Result<(T, bool), E>,
    ) -> Result<T, E> {
        let _commit = lock(&self.commit_lock);

        let base = self.snapshot();
        let mut projects = (*base.projects).clone();
        let (value, changed) = mutate(&mut projects)?;
        if !changed {
            return Ok(value);
        }

        let next = Snapshot {
            version: base.version + 1,
            projects: Arc::new(projects),
        };
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next.clone();

        tracing::debug!(
            "Committed {} version={} projects={}",
            op,
            next.version,
            next.len()
        );

        let observers: Vec<Arc<dyn SnapshotObserver>> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer.on_commit(&next);
        }

        Ok(value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
