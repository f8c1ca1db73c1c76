//! Durable storage for the project list.
use crate::types::Project;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid project list: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Project>, StoreError>;
    async fn store(&self, projects: &[Project]) -> Result<(), StoreError>;
}

/// Keeps the project list as a pretty-printed JSON array in a single file.
pub struct FilesystemProjectStore {
    path: PathBuf,
}

impl FilesystemProjectStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FilesystemProjectStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ProjectStore for FilesystemProjectStore {
    async fn load(&self) -> Result<Vec<Project>, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store(&self, projects: &[Project]) -> Result<(), StoreError> {
        let mut contents = serde_json::to_vec_pretty(projects)?;
        contents.push(b'\n');

        // Write next to the target and rename so readers never see a torn file
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        tokio::fs::write(&tmp_path, &contents)
            .await
            .map_err(|e| self.io_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.io_error(e));
        }

        tracing::info!(
            path = %self.path.display(),
            projects = projects.len(),
            "Stored project list"
        );
        Ok(())
    }
}
