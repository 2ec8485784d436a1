use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::NamedTempFile;

/// JSON file holding the credential blob of the last successful login.
///
/// The blob's schema belongs to the camera service; this store only moves
/// it between disk and memory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored blob. `Ok(None)` when there is no file.
    pub fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials file {}", self.path.display()))?;
        let value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials file {}", self.path.display()))?;
        Ok(Some(value))
    }

    /// Write the blob, replacing any previous contents.
    ///
    /// The blob is written to a temporary file next to the target and
    /// renamed over it, so readers see either the old or the new blob. On
    /// unix the file is owner read/write only.
    pub fn save(&self, credentials: &Value) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let contents = serde_json::to_string_pretty(credentials)?;
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to write credentials file {}", self.path.display()))?;
        Ok(())
    }
}
