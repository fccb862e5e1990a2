//! Where uploads and generated decks live between requests.
//!
//! Two namespaces: `uploads` holds the PDF while a request is in flight,
//! `outputs` holds the deck and lyric text until the browser downloads them.
//! Keys are flat file names; anything that could escape a namespace is
//! rejected.

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Uploads,
    Outputs,
}

impl Area {
    pub fn dir_name(self) -> &'static str {
        match self {
            Area::Uploads => "uploads",
            Area::Outputs => "outputs",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error("{area}/{name}: {source}")]
    Io {
        area: Area,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of the storage self-check reported by `/test`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub writable: bool,
    pub upload_folder_exists: bool,
    pub output_folder_exists: bool,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save(&self, area: Area, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// `Ok(None)` when no such file exists.
    async fn read(&self, area: Area, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns whether a file was removed.
    async fn delete(&self, area: Area, name: &str) -> Result<bool, StorageError>;

    /// Create the namespaces if needed and report what is usable.
    async fn status(&self) -> StorageStatus;
}

fn check_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Files under `<root>/uploads` and `<root>/outputs`.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: PathBuf,
}

impl DirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, area: Area, name: &str) -> Result<PathBuf, StorageError> {
        check_name(name)?;
        Ok(self.root.join(area.dir_name()).join(name))
    }
}

#[async_trait]
impl Storage for DirStorage {
    async fn save(&self, area: Area, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path(area, name)?;
        let io = |source| StorageError::Io {
            area,
            name: name.to_string(),
            source,
        };
        tokio::fs::create_dir_all(self.root.join(area.dir_name()))
            .await
            .map_err(io)?;
        tokio::fs::write(&path, bytes).await.map_err(io)
    }

    async fn read(&self, area: Area, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path(area, name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                area,
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn delete(&self, area: Area, name: &str) -> Result<bool, StorageError> {
        let path = self.path(area, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io {
                area,
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn status(&self) -> StorageStatus {
        let uploads = self.root.join(Area::Uploads.dir_name());
        let outputs = self.root.join(Area::Outputs.dir_name());
        let _ = tokio::fs::create_dir_all(&uploads).await;
        let _ = tokio::fs::create_dir_all(&outputs).await;

        let marker = self.root.join(format!(".write-test-{}", Uuid::new_v4().simple()));
        let writable = tokio::fs::write(&marker, b"ok").await.is_ok();
        let _ = tokio::fs::remove_file(&marker).await;

        StorageStatus {
            writable,
            upload_folder_exists: tokio::fs::metadata(&uploads).await.is_ok_and(|m| m.is_dir()),
            output_folder_exists: tokio::fs::metadata(&outputs).await.is_ok_and(|m| m.is_dir()),
        }
    }
}

/// In-process storage for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<(Area, String), Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted names currently stored in `area`.
    pub fn names(&self, area: Area) -> Vec<String> {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = files
            .keys()
            .filter(|(a, _)| *a == area)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, area: Area, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_name(name)?;
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.insert((area, name.to_string()), bytes.to_vec());
        Ok(())
    }

    async fn read(&self, area: Area, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        check_name(name)?;
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        Ok(files.get(&(area, name.to_string())).cloned())
    }

    async fn delete(&self, area: Area, name: &str) -> Result<bool, StorageError> {
        check_name(name)?;
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        Ok(files.remove(&(area, name.to_string())).is_some())
    }

    async fn status(&self) -> StorageStatus {
        StorageStatus {
            writable: true,
            upload_folder_exists: true,
            output_folder_exists: true,
        }
    }
}

/// Reduce an uploaded file name to a safe, flat ASCII name.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything outside
/// `[A-Za-z0-9._-]` is removed. Leading dots and underscores are trimmed so
/// the result can never be hidden or relative.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `YYYYmmdd_HHMMSS_xxxxxx`: local time plus six random hex digits, so two
/// uploads within the same second still get distinct keys.
pub fn timestamp_prefix() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filename_flattens_and_filters() {
        assert_eq!(secure_filename("My Song (final).pdf"), "My_Song_final.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "passwd");
        assert_eq!(secure_filename("C:\\scores\\ave maria.pdf"), "ave_maria.pdf");
        assert_eq!(secure_filename(".hidden.pdf"), "hidden.pdf");
        assert_eq!(secure_filename("Ständchen.pdf"), "Stndchen.pdf");
        assert_eq!(secure_filename("///"), "upload.pdf");
    }

    #[test]
    fn timestamp_prefix_shape() {
        let p = timestamp_prefix();
        let parts: Vec<_> = p.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 8);
        assert_eq!(parts[1].len(), 6);
        assert_eq!(parts[2].len(), 6);
        assert_ne!(timestamp_prefix(), timestamp_prefix());
    }

    #[test]
    fn names_that_escape_are_rejected() {
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(matches!(check_name(bad), Err(StorageError::InvalidName(_))), "{bad}");
        }
        assert!(check_name("20240101_000000_abcdef_output.pptx").is_ok());
    }

    #[tokio::test]
    async fn dir_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirStorage::new(dir.path());

        storage.save(Area::Outputs, "deck.pptx", b"PK").await.unwrap();
        assert!(dir.path().join("outputs/deck.pptx").exists());
        assert_eq!(storage.read(Area::Outputs, "deck.pptx").await.unwrap(), Some(b"PK".to_vec()));
        assert_eq!(storage.read(Area::Uploads, "deck.pptx").await.unwrap(), None);

        assert!(storage.delete(Area::Outputs, "deck.pptx").await.unwrap());
        assert!(!storage.delete(Area::Outputs, "deck.pptx").await.unwrap());
        assert_eq!(storage.read(Area::Outputs, "deck.pptx").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dir_storage_status_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        let status = DirStorage::new(dir.path()).status().await;
        assert!(status.writable);
        assert!(status.upload_folder_exists);
        assert!(status.output_folder_exists);
    }

    #[tokio::test]
    async fn memory_storage_lists_names() {
        let storage = MemoryStorage::new();
        storage.save(Area::Uploads, "b.pdf", b"%PDF").await.unwrap();
        storage.save(Area::Uploads, "a.pdf", b"%PDF").await.unwrap();
        assert_eq!(storage.names(Area::Uploads), vec!["a.pdf", "b.pdf"]);
        assert!(storage.names(Area::Outputs).is_empty());
        assert!(storage.delete(Area::Uploads, "a.pdf").await.unwrap());
        assert_eq!(storage.names(Area::Uploads), vec!["b.pdf"]);
    }
}
