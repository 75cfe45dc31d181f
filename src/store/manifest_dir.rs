use crate::core::path::{ensure_dir, remove_file_if_exists};
use crate::core::{DbcError, DbcResult};
use crate::store::{ManifestListing, ManifestStore};
use dbc_core::InstalledDriver;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `<id>.toml` manifests across a search path.
///
/// Reads take the first directory holding the id, writes go to the first
/// directory, and listings merge all directories with earlier ones winning.
#[derive(Debug, Clone)]
pub struct ManifestDirStore {
    search_paths: Vec<PathBuf>,
}

impl ManifestDirStore {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    fn primary(&self) -> DbcResult<&Path> {
        self.search_paths
            .first()
            .map(PathBuf::as_path)
            .ok_or_else(|| DbcError::Path("no install location configured".to_string()))
    }

    /// First directory holding a manifest for `id`
    fn locate(&self, id: &str) -> Option<&Path> {
        self.search_paths
            .iter()
            .map(PathBuf::as_path)
            .find(|dir| InstalledDriver::manifest_path(dir, id).is_file())
    }

    fn list_dir(dir: &Path, listing: &mut ManifestListing) -> DbcResult<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        listing.exists = true;

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("toml")
            {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if listing.drivers.contains_key(id) {
                continue;
            }

            match fs::read_to_string(path)
                .map_err(DbcError::from)
                .and_then(|content| InstalledDriver::from_toml_str(id, &content, path))
            {
                Ok(record) => {
                    listing.drivers.insert(id.to_string(), record);
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    listing.problems.push(e);
                }
            }
        }

        Ok(())
    }
}

impl ManifestStore for ManifestDirStore {
    fn read(&self, id: &str) -> DbcResult<Option<InstalledDriver>> {
        match self.locate(id) {
            Some(dir) => InstalledDriver::load(dir, id).map(Some),
            None => Ok(None),
        }
    }

    fn write(&self, record: &InstalledDriver) -> DbcResult<()> {
        let dir = self.primary()?;
        ensure_dir(dir)?;
        let path = record.save(dir)?;
        tracing::debug!("Wrote manifest {}", path.display());
        Ok(())
    }

    fn delete(&self, record: &InstalledDriver) -> DbcResult<()> {
        let dir = match self.locate(&record.id) {
            Some(dir) => dir,
            None => match self.search_paths.first() {
                Some(dir) => dir.as_path(),
                None => return Ok(()),
            },
        };

        remove_file_if_exists(&InstalledDriver::manifest_path(dir, &record.id))?;

        // Older layouts left a `<location>/<id>` symlink to the library.
        let legacy = dir.join(&record.id);
        if let Ok(meta) = fs::symlink_metadata(&legacy) {
            if meta.file_type().is_symlink() {
                remove_file_if_exists(&legacy)?;
            }
        }

        Ok(())
    }

    fn list_all(&self) -> DbcResult<ManifestListing> {
        let mut listing = ManifestListing::default();
        for dir in &self.search_paths {
            Self::list_dir(dir, &mut listing)?;
        }
        Ok(listing)
    }

    fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}
