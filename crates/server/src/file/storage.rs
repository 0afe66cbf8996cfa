//! Local filesystem storage for uploads.
//!
//! Files are created with create-exclusive semantics so two uploads can never
//! share a stored name, even if the namer produced the same one twice.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::namer::fresh_name;

/// How many names are tried before giving up on a create.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The upload directory is missing and cannot be created.
    #[error("upload directory {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a stored file failed.
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every generated name was already taken.
    #[error("no free file name after {} attempts", MAX_NAME_ATTEMPTS)]
    NameExhausted,
}

/// A file written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated file name, unique within the upload directory.
    pub name: String,
    /// Full path on disk.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
}

/// A file being streamed to disk.
///
/// Dropping it without [`PendingFile::finish`] leaves the partial file on disk;
/// callers discard it through [`LocalFileStorage::discard`].
#[derive(Debug)]
pub struct PendingFile {
    file: fs::File,
    stored: StoredFile,
}

impl PendingFile {
    /// Append a chunk.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| StorageError::Io {
                path: self.stored.path.clone(),
                source,
            })?;
        self.stored.size += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.stored.size
    }

    /// The file as it stands on disk.
    pub fn stored(&self) -> &StoredFile {
        &self.stored
    }

    /// Flush to disk and hand back the stored file.
    pub async fn finish(mut self) -> Result<StoredFile, StorageError> {
        let io_error = |source| StorageError::Io {
            path: self.stored.path.clone(),
            source,
        };
        self.file.flush().await.map_err(io_error)?;
        self.file.sync_all().await.map_err(io_error)?;

        debug!(name = %self.stored.name, size = self.stored.size, "file written");
        Ok(self.stored)
    }
}

/// Local filesystem storage rooted at the upload directory.
pub struct LocalFileStorage {
    /// Upload directory.
    base_path: PathBuf,
    /// Public URL prefix for stored files.
    base_url: String,
}

impl LocalFileStorage {
    /// Create a new local file storage.
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Upload directory.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the upload directory if it does not exist yet.
    ///
    /// Existing contents are never touched.
    pub async fn ensure_directory(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|source| StorageError::Unavailable {
                path: self.base_path.clone(),
                source,
            })
    }

    /// Whether the upload directory currently exists as a directory.
    pub async fn is_available(&self) -> bool {
        fs::metadata(&self.base_path)
            .await
            .is_ok_and(|m| m.is_dir())
    }

    /// Open a new, empty file named after `original_name`'s extension.
    pub async fn create(&self, original_name: &str) -> Result<PendingFile, StorageError> {
        self.create_with(|| fresh_name(original_name)).await
    }

    /// Open a new, empty file using names drawn from `next_name`.
    ///
    /// A name that already exists is skipped and a new one drawn.
    pub async fn create_with<F>(&self, mut next_name: F) -> Result<PendingFile, StorageError>
    where
        F: FnMut() -> String,
    {
        self.ensure_directory().await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = next_name();
            let path = self.base_path.join(&name);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(PendingFile {
                        file,
                        stored: StoredFile {
                            name,
                            path,
                            size: 0,
                        },
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(name = %name, "generated file name already taken");
                }
                Err(source) => return Err(StorageError::Io { path, source }),
            }
        }

        Err(StorageError::NameExhausted)
    }

    /// Delete a stored file.
    pub async fn discard(&self, stored: &StoredFile) -> Result<(), StorageError> {
        fs::remove_file(&stored.path)
            .await
            .map_err(|source| StorageError::Io {
                path: stored.path.clone(),
                source,
            })?;
        debug!(name = %stored.name, "file deleted");
        Ok(())
    }

    /// Public URL for a stored file.
    pub fn public_url(&self, stored: &StoredFile) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), stored.name)
    }
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn storage_in(dir: &tempfile::TempDir) -> LocalFileStorage {
        LocalFileStorage::new(dir.path().join("uploads"), "/uploads")
    }

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        storage.ensure_directory().await.unwrap();
        std::fs::write(storage.base_path().join("keep.txt"), b"unrelated").unwrap();
        storage.ensure_directory().await.unwrap();

        assert!(storage.is_available().await);
        let kept = std::fs::read(storage.base_path().join("keep.txt")).unwrap();
        assert_eq!(kept, b"unrelated");
    }

    #[tokio::test]
    async fn test_ensure_directory_fails_under_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let storage = LocalFileStorage::new(blocker.join("uploads"), "/uploads");
        let err = storage.ensure_directory().await.unwrap_err();

        assert!(matches!(err, StorageError::Unavailable { .. }));
        assert!(!storage.is_available().await);
    }

    #[tokio::test]
    async fn test_write_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let mut pending = storage.create("cat.png").await.unwrap();
        pending.write(b"hello ").await.unwrap();
        pending.write(b"world").await.unwrap();
        assert_eq!(pending.written(), 11);
        let stored = pending.finish().await.unwrap();

        assert!(stored.name.ends_with(".png"));
        assert_eq!(stored.size, 11);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello world");
        assert_eq!(
            storage.public_url(&stored),
            format!("/uploads/{}", stored.name)
        );
    }

    #[tokio::test]
    async fn test_create_skips_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        storage.ensure_directory().await.unwrap();
        std::fs::write(storage.base_path().join("taken.jpg"), b"first").unwrap();

        let mut names = vec!["fresh.jpg", "taken.jpg"];
        let pending = storage
            .create_with(|| names.pop().unwrap().to_string())
            .await
            .unwrap();

        assert_eq!(pending.stored().name, "fresh.jpg");
        let original = std::fs::read(storage.base_path().join("taken.jpg")).unwrap();
        assert_eq!(original, b"first");
    }

    #[tokio::test]
    async fn test_create_gives_up_when_names_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        storage.ensure_directory().await.unwrap();
        std::fs::write(storage.base_path().join("same.jpg"), b"x").unwrap();

        let err = storage
            .create_with(|| "same.jpg".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NameExhausted));
    }

    #[tokio::test]
    async fn test_create_recreates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        assert!(!storage.is_available().await);

        let pending = storage.create("a.gif").await.unwrap();
        assert!(storage.is_available().await);
        assert!(pending.stored().path.exists());
    }

    #[tokio::test]
    async fn test_discard() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);

        let pending = storage.create("a.jpg").await.unwrap();
        let stored = pending.finish().await.unwrap();
        storage.discard(&stored).await.unwrap();
        assert!(!stored.path.exists());

        // A second delete reports the failure instead of panicking.
        assert!(storage.discard(&stored).await.is_err());
    }

    #[test]
    fn test_public_url_trims_slash() {
        let storage = LocalFileStorage::new("/tmp/uploads", "/uploads/");
        let stored = StoredFile {
            name: "1-2.jpg".to_string(),
            path: PathBuf::from("/tmp/uploads/1-2.jpg"),
            size: 0,
        };
        assert_eq!(storage.public_url(&stored), "/uploads/1-2.jpg");
    }
}
