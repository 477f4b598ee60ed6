//! JSON file backend
//!
//! Writes go to a sibling temp file which is then renamed over the store,
//! so a crash mid-write keeps the last complete document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::backend::StatsBackend;
use super::error::StatsResult;
use super::schema::StatsStore;

pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StatsBackend for JsonFileBackend {
    async fn load(&self) -> StatsResult<Option<StatsStore>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let store = serde_json::from_str(&content)?;
        Ok(Some(store))
    }

    async fn save(&self, store: &StatsStore) -> StatsResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let document = serde_json::to_vec_pretty(store)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &document).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        trace!("wrote {} bytes to {}", document.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json file {}", self.path.display())
    }
}
