//! Bootstrap cache
//!
//! One JSON file per identity holding the last applied record set. It is
//! read when an identity becomes available, before the first remote snapshot
//! arrives, so the UI does not start empty.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::identity::Identity;
use crate::models::Record;

#[derive(Debug, Clone)]
pub struct BootstrapCache {
    dir: PathBuf,
}

impl BootstrapCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.json", identity.uid))
    }

    /// Cached records for `identity`. A missing file is an empty cache.
    pub fn load(&self, identity: &Identity) -> Result<Vec<Record>> {
        match std::fs::read_to_string(self.path_for(identity)) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    /// Overwrite the cache for `identity`.
    pub fn store(&self, identity: &Identity, records: &[Record]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(identity);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(records)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn remove(&self, identity: &Identity) -> Result<()> {
        match std::fs::remove_file(self.path_for(identity)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}
