//! Persistence for installed-driver records.
//!
//! Unix-likes keep one `<id>.toml` per driver in the scope directory. On
//! Windows the user and system scopes also use registry keys, which win over
//! manifest files with the same id.

pub mod manifest_dir;
#[cfg(windows)]
pub mod windows;

use crate::config::InstallScope;
use crate::core::{DbcError, DbcResult};
use dbc_core::InstalledDriver;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use manifest_dir::ManifestDirStore;

/// Everything a store could enumerate
#[derive(Debug, Default)]
pub struct ManifestListing {
    pub drivers: BTreeMap<String, InstalledDriver>,
    /// Records that exist but could not be read
    pub problems: Vec<DbcError>,
    /// Whether any backing location exists at all
    pub exists: bool,
}

pub trait ManifestStore: Send + Sync {
    /// Record for `id`, or `None` when nothing is installed under that id
    fn read(&self, id: &str) -> DbcResult<Option<InstalledDriver>>;

    fn write(&self, record: &InstalledDriver) -> DbcResult<()>;

    /// Remove the record. Already-absent records are not an error.
    fn delete(&self, record: &InstalledDriver) -> DbcResult<()>;

    fn list_all(&self) -> DbcResult<ManifestListing>;

    /// Directories backing the store, first one receiving writes
    fn search_paths(&self) -> &[PathBuf];
}

/// Store backing a scope on this platform
pub fn store_for(scope: InstallScope, search_paths: Vec<PathBuf>) -> Box<dyn ManifestStore> {
    #[cfg(windows)]
    {
        if scope != InstallScope::PerEnvironment {
            return Box::new(windows::RegistryStore::new(scope, search_paths));
        }
    }
    #[cfg(not(windows))]
    let _ = scope;

    Box::new(ManifestDirStore::new(search_paths))
}

/// Registry key path shown as the location of a Windows scope
pub fn registry_location(scope: InstallScope) -> String {
    let hive = match scope {
        InstallScope::System => "HKLM",
        _ => "HKCU",
    };
    format!(r"{}\SOFTWARE\ADBC\Drivers", hive)
}
