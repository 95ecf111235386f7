use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use suiteflow_core::error::CollaboratorError;
use suiteflow_core::report::ReportStore;
use tracing::debug;

/// Writes report objects as files under a root directory.
pub struct FsReportStore {
    root: PathBuf,
}

impl FsReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CollaboratorError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(CollaboratorError::rejected(format!("invalid report key: {key}")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    fn name(&self) -> &str {
        "fs"
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<String, CollaboratorError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "report written");
        Ok(path.display().to_string())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, CollaboratorError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
