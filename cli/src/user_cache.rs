//! On-disk copy of the account user directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use board_core::UserDirectory;

const FILE_NAME: &str = "users.json";

pub struct UserCache {
    path: PathBuf,
}

impl UserCache {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file under the platform cache directory, or the working
    /// directory when the platform has none.
    pub fn default_location() -> Self {
        let dir = dirs::cache_dir()
            .map(|dir| dir.join("board-cli"))
            .unwrap_or_else(|| PathBuf::from(".board-cli"));
        Self::at(dir.join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file counts as no cache.
    pub fn load(&self) -> Option<UserDirectory> {
        let raw = fs::read_to_string(&self.path).ok()?;
        UserDirectory::from_json(&raw)
    }

    pub fn store(&self, directory: &UserDirectory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = directory.to_json().context("serializing user directory")?;
        fs::write(&self.path, raw).with_context(|| format!("writing {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), users = directory.users.len(), "user cache stored");
        Ok(())
    }
}
