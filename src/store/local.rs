// Local Directory Store
// Publishes artifacts into a directory on disk (preview / dry run)

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use super::{ArtifactSet, ArtifactStore, PublishReceipt, StateStore, StoreError};

/// Directory-backed state + artifact store.
///
/// Each file is written to a temp sibling and renamed into place. The
/// success marker is written after every other file so a run that fails
/// half way never leaves a marker behind.
pub struct LocalDirStore {
    root: PathBuf,
    state_path: String,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>, state_path: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            state_path: state_path.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an artifact path under the root, refusing anything that
    /// would escape it.
    fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("artifact path outside output directory: {}", relative),
            )));
        }
        Ok(self.root.join(rel))
    }

    async fn write_atomic(&self, relative: &str, content: &str) -> Result<(), StoreError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalDirStore {
    fn state_path(&self) -> &str {
        &self.state_path
    }

    async fn fetch_state(&self) -> Result<Option<String>, StoreError> {
        let path = self.resolve(&self.state_path)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[async_trait]
impl ArtifactStore for LocalDirStore {
    fn display_name(&self) -> String {
        self.root.display().to_string()
    }

    async fn publish(
        &self,
        artifacts: &ArtifactSet,
        _message: &str,
    ) -> Result<PublishReceipt, StoreError> {
        for path in artifacts.paths() {
            self.resolve(path)?;
        }

        for (path, content) in artifacts.iter().filter(|(p, _)| *p != self.state_path) {
            self.write_atomic(path, content).await?;
        }
        if let Some(marker) = artifacts.get(&self.state_path) {
            self.write_atomic(&self.state_path, marker).await?;
        }

        info!("Wrote {} files to {}", artifacts.len(), self.root.display());
        Ok(PublishReceipt {
            target: self.root.display().to_string(),
            revision: "local".to_string(),
            files: artifacts.len(),
        })
    }
}
