//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "finder-link";

/// Tokio-based file system implementation
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Per-user application data directory, e.g. `~/.local/share/finder-link`.
    pub fn default_data_directory() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME)
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent).await?;
            }
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await.map_err(Self::map_io_error)?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error)?
        {
            entries.push(entry.path());
        }

        entries.sort();
        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_data_directory() {
        let dir = TokioFileSystem::default_data_directory();
        assert!(dir.ends_with(APP_DIR_NAME));
    }

    #[tokio::test]
    async fn test_write_read_rename_delete() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let original = tmp.path().join("nested").join("Report.goox");
        let renamed = tmp.path().join("nested").join("Summary.goox");

        fs.write_file(&original, Bytes::from("abc123")).await.unwrap();
        assert!(fs.exists(&original).await.unwrap());
        assert_eq!(fs.read_file(&original).await.unwrap(), Bytes::from("abc123"));

        fs.rename(&original, &renamed).await.unwrap();
        assert!(!fs.exists(&original).await.unwrap());
        assert_eq!(fs.read_file(&renamed).await.unwrap(), Bytes::from("abc123"));

        fs.delete_file(&renamed).await.unwrap();
        assert!(!fs.exists(&renamed).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_file_reports_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();

        let err = fs
            .delete_file(&tmp.path().join("missing.goox"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_directory_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let fs = TokioFileSystem::new();
        fs.write_file(&tmp.path().join("b.goox"), Bytes::from("2")).await.unwrap();
        fs.write_file(&tmp.path().join("a.goox"), Bytes::from("1")).await.unwrap();

        let entries = fs.list_directory(tmp.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![tmp.path().join("a.goox"), tmp.path().join("b.goox")]
        );
    }
}
