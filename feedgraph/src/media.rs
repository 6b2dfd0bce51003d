//! Media reference resolution.
//!
//! Uploaded files are handed to a [`MediaStore`] which persists them and returns a stable
//! [`MediaRef`] (`/public/<directory>/<file>`). [`MediaResolver`] layers the cleanup policy on top:
//! files stored for a request that later fails are released, and replaced files are released after
//! the new reference has been committed. Release failures are logged, never propagated.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use log::{debug, warn};
use nanoid::nanoid;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::errors::{GraphError, GraphResult};

/// URL mount every reference is served under.
pub const PUBLIC_MOUNT: &str = "/public";

const FILE_SUFFIX_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k',
    'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    PostImage,
    PostVideo,
    AudioTrack,
    AudioCover,
}

impl MediaKind {
    pub fn directory(&self) -> &'static str {
        match self {
            Self::PostImage => "post_images",
            Self::PostVideo => "post_videos",
            Self::AudioTrack => "audio",
            Self::AudioCover => "audio_image",
        }
    }
}

/// Raw uploaded file as received at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lowercased extension including the leading dot, or empty.
    fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }
}

/// Stable public path of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(kind: MediaKind, file_name: &str) -> Self {
        Self(format!("{PUBLIC_MOUNT}/{}/{file_name}", kind.directory()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path relative to the media root. Rejects references outside the public mount.
    pub fn relative_path(&self) -> GraphResult<PathBuf> {
        let rest = self
            .0
            .strip_prefix(PUBLIC_MOUNT)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| GraphError::invalid(format!("media reference '{}' is not public", self.0)))?;
        let path = PathBuf::from(rest);
        let well_formed = path.components().count() >= 2
            && path.components().all(|component| matches!(component, Component::Normal(_)));
        if !well_formed {
            return Err(GraphError::invalid(format!("media reference '{}' is malformed", self.0)));
        }
        Ok(path)
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn stored_file_name(upload: &MediaUpload) -> String {
    format!(
        "{}-{}{}",
        Utc::now().timestamp_millis(),
        nanoid!(8, FILE_SUFFIX_ALPHABET),
        upload.extension()
    )
}

/// Media storage collaborator.
#[allow(async_fn_in_trait)]
pub trait MediaStore {
    async fn store(&self, kind: MediaKind, upload: &MediaUpload) -> GraphResult<MediaRef>;

    /// Removes the file. Releasing a reference that no longer exists succeeds.
    async fn release(&self, reference: &MediaRef) -> GraphResult<()>;
}

/// Writes files below `root/<directory>/`.
#[derive(Debug, Clone)]
pub struct DiskMediaStore {
    root: PathBuf,
}

impl DiskMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, reference: &MediaRef) -> GraphResult<PathBuf> {
        Ok(self.root.join(reference.relative_path()?))
    }
}

impl MediaStore for DiskMediaStore {
    async fn store(&self, kind: MediaKind, upload: &MediaUpload) -> GraphResult<MediaRef> {
        let directory = self.root.join(kind.directory());
        fs::create_dir_all(&directory).await?;
        let file_name = stored_file_name(upload);
        fs::write(directory.join(&file_name), &upload.bytes).await?;
        let reference = MediaRef::new(kind, &file_name);
        debug!("stored {} bytes at {reference}", upload.bytes.len());
        Ok(reference)
    }

    async fn release(&self, reference: &MediaRef) -> GraphResult<()> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryMediaInner {
    files: Mutex<HashMap<MediaRef, Vec<u8>>>,
    fail_store: AtomicBool,
    fail_release: AtomicBool,
}

/// Keeps uploaded bytes in memory. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaStore {
    inner: Arc<MemoryMediaInner>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &MediaRef) -> bool {
        self.inner.files.lock().contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.inner.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_stores(&self, fail: bool) {
        self.inner.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_releases(&self, fail: bool) {
        self.inner.fail_release.store(fail, Ordering::SeqCst);
    }
}

impl MediaStore for MemoryMediaStore {
    async fn store(&self, kind: MediaKind, upload: &MediaUpload) -> GraphResult<MediaRef> {
        if self.inner.fail_store.load(Ordering::SeqCst) {
            return Err(GraphError::Other {
                message: "media store rejected upload".into(),
            });
        }
        let reference = MediaRef::new(kind, &stored_file_name(upload));
        self.inner.files.lock().insert(reference.clone(), upload.bytes.clone());
        Ok(reference)
    }

    async fn release(&self, reference: &MediaRef) -> GraphResult<()> {
        if self.inner.fail_release.load(Ordering::SeqCst) {
            return Err(GraphError::Other {
                message: format!("cannot release {reference}").into(),
            });
        }
        self.inner.files.lock().remove(reference);
        Ok(())
    }
}

/// Applies the cleanup-on-failure and cleanup-on-replace policy over a [`MediaStore`].
#[derive(Debug, Clone)]
pub struct MediaResolver<M> {
    store: M,
}

impl<M: MediaStore> MediaResolver<M> {
    pub fn new(store: M) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &M {
        &self.store
    }

    /// Stores every upload in order. If one fails, the files already stored are released before the
    /// error is returned.
    pub async fn stage(&self, uploads: &[(MediaKind, &MediaUpload)]) -> GraphResult<Vec<MediaRef>> {
        let mut staged = Vec::with_capacity(uploads.len());
        for (kind, upload) in uploads {
            match self.store.store(*kind, upload).await {
                Ok(reference) => staged.push(reference),
                Err(err) => {
                    self.discard(&staged).await;
                    return Err(err);
                }
            }
        }
        Ok(staged)
    }

    pub async fn release_quietly(&self, reference: &MediaRef) {
        if let Err(err) = self.store.release(reference).await {
            warn!("failed to release media {reference}: {err}");
        }
    }

    pub async fn discard(&self, references: &[MediaRef]) {
        for reference in references {
            self.release_quietly(reference).await;
        }
    }
}
