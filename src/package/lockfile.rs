use crate::core::{DbcError, DbcResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lock file format written by this version
pub const LOCK_FILE_VERSION: u32 = 1;

/// A resolved driver recorded by the last successful sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub name: String,
    pub version: Version,
    pub platform: String,
    pub checksum: String,
}

/// `dbc.lock`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    pub version: u32,
    #[serde(default)]
    pub drivers: Vec<LockEntry>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: LOCK_FILE_VERSION,
            drivers: Vec::new(),
        }
    }
}

impl Lockfile {
    /// Lock file next to a driver list: `dbc.toml` -> `dbc.lock`
    pub fn path_for(list_path: &Path) -> PathBuf {
        list_path.with_extension("lock")
    }

    /// Load a lock file. A missing file is an empty lock; anything unreadable
    /// or unparsable is an error.
    pub fn load(path: &Path) -> DbcResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let lock: Lockfile = toml::from_str(&content).map_err(|e| {
            DbcError::Package(format!("Lock file {} is corrupt: {}", path.display(), e))
        })?;

        if lock.version > LOCK_FILE_VERSION {
            return Err(DbcError::Package(format!(
                "Lock file {} has version {}, this dbc only understands version {}",
                path.display(),
                lock.version,
                LOCK_FILE_VERSION
            )));
        }
        Ok(lock)
    }

    /// Overwrite `path` with this lock
    pub fn save(&self, path: &Path) -> DbcResult<()> {
        let mut lock = self.clone();
        lock.version = LOCK_FILE_VERSION;
        fs::write(path, toml::to_string(&lock)?)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&LockEntry> {
        self.drivers.iter().find(|e| e.name == name)
    }
}
