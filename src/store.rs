//! JSON document store: whole file loaded into memory, rewritten after each mutation.

use crate::error::{AppError, ConfigError};
use crate::record::Document;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs, sync::Mutex};

/// Handle to the loaded document. Cloning shares the same document.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Document>>,
    file_path: PathBuf,
    persist: bool,
}

impl Store {
    /// Load the document at `path`. A missing file starts as `{}` and is
    /// created when `persist` is set; unreadable or non-object content is an error.
    pub async fn open<P: Into<PathBuf>>(path: P, persist: bool) -> Result<Self, ConfigError> {
        let file_path = path.into();
        let doc = match fs::read(&file_path).await {
            Ok(bytes) => parse_document(&bytes)
                .map_err(|e| ConfigError::Load(format!("{}: {}", file_path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let empty = Document::new();
                if persist {
                    write_document(&file_path, &empty)
                        .await
                        .map_err(|e| ConfigError::Load(format!("{}: {}", file_path.display(), e)))?;
                    tracing::info!(path = %file_path.display(), "created empty document");
                }
                empty
            }
            Err(e) => return Err(ConfigError::Load(format!("{}: {}", file_path.display(), e))),
        };
        Ok(Self::from_document(doc, file_path, persist))
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: Document, file_path: PathBuf, persist: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(doc)),
            file_path,
            persist,
        }
    }

    /// Run a read-only closure against the current document.
    pub async fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&Document) -> T,
    {
        let doc = self.inner.lock().await;
        f(&doc)
    }

    pub async fn snapshot(&self) -> Document {
        self.read(Document::clone).await
    }

    /// Apply a mutation to a copy of the document, persist the copy, then
    /// install it. If the closure or the write fails the document is unchanged.
    pub async fn write<T, F>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Document) -> Result<T, AppError>,
    {
        let mut doc = self.inner.lock().await;
        let mut next = doc.clone();
        let out = f(&mut next)?;
        if self.persist {
            write_document(&self.file_path, &next).await?;
            tracing::debug!(path = %self.file_path.display(), "persisted document");
        }
        *doc = next;
        Ok(out)
    }

    /// Whether the backing file can be read. Always true without persistence.
    pub async fn is_readable(&self) -> bool {
        !self.persist || fs::metadata(&self.file_path).await.is_ok()
    }
}

fn parse_document(bytes: &[u8]) -> Result<Document, String> {
    match serde_json::from_slice::<Value>(bytes).map_err(|e| e.to_string())? {
        Value::Object(doc) => Ok(doc),
        _ => Err("document must be a JSON object".into()),
    }
}

/// Write pretty JSON to `<path>.tmp`, then rename it over `path`. The temp
/// file is removed again if either step fails.
async fn write_document(path: &Path, doc: &Document) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_vec_pretty(doc)?;
    let tmp = tmp_path(path);
    let written = match fs::write(&tmp, data).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove temp file");
            }
        }
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
