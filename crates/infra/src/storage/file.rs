//! Directory-backed key-value store.
//!
//! One file per key. Writes go to a temporary sibling that is synced and
//! renamed over the target, so readers see either the old or the new value.
//! Concurrent writers to the same key are last-writer-wins.
//!
//! On unix the directory is kept at mode 0700 and values are written 0600,
//! since the stores hold the session key and sealed sessions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use panelpost_core::KeyValueStore;
use panelpost_domain::{PanelPostError, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::InfraError;

const VALUE_EXTENSION: &str = "json";
#[cfg(unix)]
const PRIVATE_DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(PanelPostError::InvalidInput(format!("invalid storage key: {key:?}")));
        }
        Ok(self.root.join(format!("{key}.{VALUE_EXTENSION}")))
    }

    /// Create the root if needed and take group/other access away from it.
    ///
    /// Only the owner may chmod, so a directory planted by another user
    /// fails here instead of receiving our values.
    async fn ensure_root(&self) -> std::io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(PRIVATE_DIR_MODE);
        builder.create(&self.root).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = fs::metadata(&self.root).await?.permissions().mode();
            if mode & 0o077 != 0 {
                fs::set_permissions(&self.root, std::fs::Permissions::from_mode(PRIVATE_DIR_MODE))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));

        self.ensure_root().await.map_err(InfraError::from)?;

        let write = async {
            let mut options = fs::OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            options.mode(PRIVATE_FILE_MODE);
            let mut file = options.open(&temp_path).await?;
            file.write_all(value.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);

            // Atomic rename
            fs::rename(&temp_path, &path).await
        };

        if let Err(err) = write.await {
            fs::remove_file(&temp_path).await.ok();
            return Err(InfraError::from(err).into());
        }

        debug!(path = %path.display(), "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }
}
