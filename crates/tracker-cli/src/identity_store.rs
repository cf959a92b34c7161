//! Signed-in identity persisted between CLI invocations.

use std::path::{Path, PathBuf};

use tracker_core::Identity;

use crate::error::CliError;

const IDENTITY_FILE_NAME: &str = "identity.json";
const DATABASE_FILE_NAME: &str = "tracker.db";
const CACHE_DIR_NAME: &str = "cache";

/// Resolved on-disk locations for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl DataPaths {
    pub fn resolve(data_dir: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))?
                .join("tracker"),
        };
        let db_path = db_path.unwrap_or_else(|| data_dir.join(DATABASE_FILE_NAME));
        Ok(Self { data_dir, db_path })
    }

    pub fn identity_file(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join(CACHE_DIR_NAME)
    }
}

pub fn load_identity(path: &Path) -> Result<Option<Identity>, CliError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let identity: Identity = serde_json::from_str(&raw)?;
    // Re-validate: the file may have been edited by hand.
    let identity = if identity.is_anonymous {
        Identity::anonymous(identity.uid)?
    } else {
        Identity::new(identity.uid)?
    };
    Ok(Some(identity))
}

pub fn save_identity(path: &Path, identity: &Identity) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(identity)?)?;
    Ok(())
}

pub fn clear_identity(path: &Path) -> Result<(), CliError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}
