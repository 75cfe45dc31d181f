use crate::config::InstallScope;
use crate::core::platform::current_platform;
use crate::core::{DbcError, DbcResult};
use crate::store::{ManifestDirStore, ManifestListing, ManifestStore};
use dbc_core::package::manifest::{DriverEntry, SharedLibraries, MANIFEST_VERSION};
use dbc_core::InstalledDriver;
use semver::Version;
use std::io;
use std::path::{Path, PathBuf};
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};
use winreg::RegKey;

const DRIVERS_KEY: &str = r"SOFTWARE\ADBC\Drivers";

/// Driver records as registry keys under `HKCU`/`HKLM\SOFTWARE\ADBC\Drivers\<id>`,
/// merged with manifest files in the scope directory. Keys win on collision.
pub struct RegistryStore {
    system: bool,
    files: ManifestDirStore,
}

impl RegistryStore {
    pub fn new(scope: InstallScope, search_paths: Vec<PathBuf>) -> Self {
        Self {
            system: scope == InstallScope::System,
            files: ManifestDirStore::new(search_paths),
        }
    }

    fn root(&self) -> RegKey {
        if self.system {
            RegKey::predef(HKEY_LOCAL_MACHINE)
        } else {
            RegKey::predef(HKEY_CURRENT_USER)
        }
    }

    fn key_path(id: &str) -> String {
        format!(r"{}\{}", DRIVERS_KEY, id)
    }

    fn read_key(&self, id: &str) -> DbcResult<Option<InstalledDriver>> {
        let root = self.root();
        let key = match root.open_subkey_with_flags(Self::key_path(id), KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let text = |name: &str| -> DbcResult<String> {
            match key.get_value::<String, _>(name) {
                Ok(value) => Ok(value),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
                Err(e) => Err(e.into()),
            }
        };

        let manifest_version = key.get_value::<u32, _>("manifest_version").unwrap_or(1);
        let origin = Path::new(DRIVERS_KEY).join(id);
        let version = Version::parse(&text("version")?).map_err(|e| {
            DbcError::Package(format!("Invalid version in {}: {}", origin.display(), e))
        })?;
        let entrypoint = Some(text("entrypoint")?).filter(|s| !s.is_empty());

        let record = InstalledDriver {
            id: id.to_string(),
            manifest_version,
            name: text("name")?,
            publisher: text("publisher")?,
            license: text("license")?,
            version,
            source: text("source")?,
            adbc: Default::default(),
            driver: DriverEntry {
                entrypoint,
                shared: SharedLibraries::Single(text("driver")?),
            },
        };
        record.check_manifest_version(&origin)?;
        Ok(Some(record))
    }
}

impl ManifestStore for RegistryStore {
    fn read(&self, id: &str) -> DbcResult<Option<InstalledDriver>> {
        match self.read_key(id)? {
            Some(record) => Ok(Some(record)),
            None => self.files.read(id),
        }
    }

    fn write(&self, record: &InstalledDriver) -> DbcResult<()> {
        let root = self.root();
        let (key, _) = root.create_subkey(Self::key_path(&record.id))?;

        let platform = current_platform();
        let library = record.driver.shared.get(&platform).unwrap_or_default();

        key.set_value("name", &record.name)?;
        key.set_value("publisher", &record.publisher)?;
        key.set_value("license", &record.license)?;
        key.set_value("version", &record.version.to_string())?;
        key.set_value("source", &record.source)?;
        key.set_value("driver", &library.to_string())?;
        if let Some(entrypoint) = &record.driver.entrypoint {
            key.set_value("entrypoint", entrypoint)?;
        }
        key.set_value("manifest_version", &MANIFEST_VERSION)?;

        tracing::debug!("Wrote registry key {}", Self::key_path(&record.id));
        Ok(())
    }

    fn delete(&self, record: &InstalledDriver) -> DbcResult<()> {
        let root = self.root();
        match root.delete_subkey_all(Self::key_path(&record.id)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.files.delete(record)
    }

    fn list_all(&self) -> DbcResult<ManifestListing> {
        let mut listing = self.files.list_all()?;

        let root = self.root();
        let drivers = match root.open_subkey_with_flags(DRIVERS_KEY, KEY_READ) {
            Ok(key) => key,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(e.into()),
        };
        listing.exists = true;

        for id in drivers.enum_keys() {
            let id = id?;
            match self.read_key(&id) {
                Ok(Some(record)) => {
                    listing.drivers.insert(id, record);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(r"Skipping {}\{}: {}", DRIVERS_KEY, id, e);
                    listing.problems.push(e);
                }
            }
        }

        Ok(listing)
    }

    fn search_paths(&self) -> &[PathBuf] {
        self.files.search_paths()
    }
}
