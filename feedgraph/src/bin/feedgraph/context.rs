use std::path::Path;

use anyhow::{Context, Result};

use feedgraph::{DiskMediaStore, GraphStore, MediaUpload, NotificationHub, Principal, Settings, SocialGraph};

/// Graph handle plus the principal the command acts as.
pub struct Session<S> {
    pub graph: SocialGraph<S, DiskMediaStore>,
    principal: Option<Principal>,
}

impl<S: GraphStore> Session<S> {
    pub fn new(store: S, settings: &Settings, acting_as: Option<String>, admin: bool) -> Self {
        let media = DiskMediaStore::new(&settings.media.root);
        let principal = acting_as.map(|id| if admin { Principal::admin(id) } else { Principal::user(id) });
        Self {
            graph: SocialGraph::new(store, media, NotificationHub::shared()),
            principal,
        }
    }

    /// The acting principal. Commands that mutate or read personalised state require `--as`.
    pub fn principal(&self) -> Result<&Principal> {
        self.principal
            .as_ref()
            .context("this command needs an acting user; pass --as <user-id>")
    }
}

/// Reads a local file into an upload.
pub async fn read_upload(path: &Path) -> Result<MediaUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(MediaUpload::new(file_name, bytes))
}

pub async fn read_optional_upload(path: Option<&Path>) -> Result<Option<MediaUpload>> {
    match path {
        Some(path) => Ok(Some(read_upload(path).await?)),
        None => Ok(None),
    }
}
