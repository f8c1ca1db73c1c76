use crate::metrics_defs::PROJECTS_CONFIGURED;
use crate::store::{ProjectStore, StoreError};
use crate::types::Project;
use parking_lot::RwLock;
use shared::gauge;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("could not load project list: {0}")]
    Load(#[source] StoreError),

    #[error("could not store project list: {0}")]
    Store(#[source] StoreError),

    #[error("project list must not be empty")]
    EmptyProjectList,

    #[error("update lock closed")]
    UpdateLockClosed(#[from] AcquireError),
}

struct RegistryInner {
    store: Arc<dyn ProjectStore>,
    projects: RwLock<Arc<Vec<Project>>>,
    // Serializes replace_all so two writers cannot interleave store and swap.
    update_lock: Semaphore,
}

/// In-memory view of the configured projects, backed by a [`ProjectStore`].
///
/// Cloning is cheap and every clone observes the same list.
#[derive(Clone)]
pub struct ProjectRegistry {
    inner: Arc<RegistryInner>,
}

impl ProjectRegistry {
    /// Loads the project list from `store`. Any failure here is fatal for the caller.
    pub async fn load(store: Arc<dyn ProjectStore>) -> Result<Self, RegistryError> {
        let projects = store.load().await.map_err(RegistryError::Load)?;
        tracing::info!(projects = projects.len(), "Loaded project list");
        gauge!(PROJECTS_CONFIGURED).set(projects.len() as f64);

        Ok(ProjectRegistry {
            inner: Arc::new(RegistryInner {
                store,
                projects: RwLock::new(Arc::new(projects)),
                update_lock: Semaphore::new(1),
            }),
        })
    }

    /// Returns the first project whose site id equals `site_id`.
    pub fn find(&self, site_id: &str) -> Option<Project> {
        self.inner
            .projects
            .read()
            .iter()
            .find(|p| p.site_id == site_id)
            .cloned()
    }

    pub fn get_all(&self) -> Arc<Vec<Project>> {
        self.inner.projects.read().clone()
    }

    /// Persists `projects` and then installs them. When the store fails, the
    /// in-memory list is left untouched.
    pub async fn replace_all(&self, projects: Vec<Project>) -> Result<(), RegistryError> {
        if projects.is_empty() {
            return Err(RegistryError::EmptyProjectList);
        }

        let _permit = self.inner.update_lock.acquire().await?;

        self.inner
            .store
            .store(&projects)
            .await
            .map_err(RegistryError::Store)?;

        let count = projects.len();
        *self.inner.projects.write() = Arc::new(projects);
        gauge!(PROJECTS_CONFIGURED).set(count as f64);
        tracing::info!(projects = count, "Replaced project list");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::io;

    struct MemoryStore {
        projects: Mutex<Vec<Project>>,
        fail_writes: bool,
    }

    impl MemoryStore {
        fn new(projects: Vec<Project>, fail_writes: bool) -> Arc<Self> {
            Arc::new(MemoryStore {
                projects: Mutex::new(projects),
                fail_writes,
            })
        }
    }

    #[async_trait]
    impl ProjectStore for MemoryStore {
        async fn load(&self) -> Result<Vec<Project>, StoreError> {
            Ok(self.projects.lock().clone())
        }

        async fn store(&self, projects: &[Project]) -> Result<(), StoreError> {
            if self.fail_writes {
                return Err(StoreError::Io {
                    path: "memory".into(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            *self.projects.lock() = projects.to_vec();
            Ok(())
        }
    }

    fn initial_projects() -> Vec<Project> {
        vec![
            Project::new("site-a", "Alpha", "key-a"),
            Project::new("site-b", "Beta", "key-b"),
            Project::new("site-a", "Alpha duplicate", "key-a2"),
        ]
    }

    #[tokio::test]
    async fn test_find_returns_first_match() {
        let registry = ProjectRegistry::load(MemoryStore::new(initial_projects(), false))
            .await
            .unwrap();

        let project = registry.find("site-a").unwrap();
        assert_eq!(project.api_key, "key-a");
        assert_eq!(registry.find("site-b").unwrap().project_name, "Beta");
        assert!(registry.find("site-z").is_none());
        assert_eq!(registry.get_all().len(), 3);
    }

    #[tokio::test]
    async fn test_replace_all_swaps_and_persists() {
        let store = MemoryStore::new(initial_projects(), false);
        let registry = ProjectRegistry::load(store.clone()).await.unwrap();

        let replacement = vec![Project::new("site-c", "Gamma", "key-c")];
        registry.replace_all(replacement.clone()).await.unwrap();

        assert!(registry.find("site-a").is_none());
        assert_eq!(registry.find("site-c").unwrap().api_key, "key-c");
        assert_eq!(*store.projects.lock(), replacement);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_list() {
        let registry = ProjectRegistry::load(MemoryStore::new(initial_projects(), true))
            .await
            .unwrap();

        let result = registry
            .replace_all(vec![Project::new("site-c", "Gamma", "key-c")])
            .await;

        assert!(matches!(result.unwrap_err(), RegistryError::Store(_)));
        assert_eq!(*registry.get_all(), initial_projects());
        assert!(registry.find("site-c").is_none());
        assert_eq!(registry.find("site-a").unwrap().api_key, "key-a");
    }

    #[tokio::test]
    async fn test_empty_replacement_rejected() {
        let registry = ProjectRegistry::load(MemoryStore::new(initial_projects(), false))
            .await
            .unwrap();

        assert!(matches!(
            registry.replace_all(vec![]).await.unwrap_err(),
            RegistryError::EmptyProjectList
        ));
        assert_eq!(registry.get_all().len(), 3);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let registry = ProjectRegistry::load(MemoryStore::new(initial_projects(), false))
            .await
            .unwrap();
        let other = registry.clone();

        registry
            .replace_all(vec![Project::new("site-c", "Gamma", "key-c")])
            .await
            .unwrap();
        assert!(other.find("site-c").is_some());
    }
}
