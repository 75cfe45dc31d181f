use crate::config::ScopeConfig;
use crate::core::path::{ensure_dir, remove_dir_if_exists, remove_file_if_exists};
use crate::core::platform::current_platform;
use crate::core::version::DriverConstraint;
use crate::core::{DbcError, DbcResult};
use crate::package::checksum::file_checksum;
use crate::package::downloader::{DownloadEvent, DownloadedPackage, PackageDownloader};
use crate::package::extractor::{ExtractedPackage, PackageExtractor};
use crate::package::machine::{InstallEvent, InstallMachine, InstallOutcome, InstallState, InstallWork};
use crate::package::selection::{self, PackageSelection};
use crate::package::signature::SignatureVerifier;
use crate::registry::DriverRegistry;
use crate::store::ManifestStore;
use dbc_core::InstalledDriver;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const GITIGNORE_CONTENT: &str = "# Created by dbc\n*\n";

#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    pub verify_signatures: bool,
    pub allow_prerelease: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            allow_prerelease: false,
        }
    }
}

/// What to install
#[derive(Debug, Clone)]
pub enum InstallTarget {
    /// Look the driver up and pick the best version
    Resolve {
        name: String,
        constraint: Option<DriverConstraint>,
    },
    /// Install an already-chosen package
    Selected(PackageSelection),
}

/// Receives install progress. Every method defaults to doing nothing.
pub trait InstallObserver: Send + Sync {
    fn on_state(&self, _driver: &str, _state: InstallState) {}

    fn on_download_progress(&self, _driver: &str, _downloaded: u64, _total: Option<u64>) {}

    fn on_warning(&self, _warning: &DbcError) {}
}

pub struct NoopObserver;

impl InstallObserver for NoopObserver {}

/// Runs the install state machine against a scope
pub struct Installer {
    registry: Arc<DriverRegistry>,
    downloader: PackageDownloader,
    verifier: SignatureVerifier,
    platform: String,
    options: InstallOptions,
}

impl Installer {
    pub fn new(registry: Arc<DriverRegistry>, options: InstallOptions) -> DbcResult<Self> {
        let downloader = PackageDownloader::new(registry.fetcher().clone());
        Ok(Self {
            registry,
            downloader,
            verifier: SignatureVerifier::new()?,
            platform: current_platform(),
            options,
        })
    }

    pub fn with_verifier(mut self, verifier: SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn options(&self) -> InstallOptions {
        self.options
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Find `name` in the registries and pick the best version for this platform
    pub async fn select(
        &self,
        name: &str,
        constraint: Option<&DriverConstraint>,
        observer: &dyn InstallObserver,
    ) -> DbcResult<PackageSelection> {
        let (driver, warning) = self.registry.find(name).await?;
        if let Some(warning) = warning {
            observer.on_warning(&warning);
        }
        selection::resolve(&driver, constraint, &self.platform, self.options.allow_prerelease)
    }

    /// Install one driver into `scope`.
    ///
    /// Work is issued one unit at a time; the next unit starts only after the
    /// previous one has reported back to the machine.
    pub async fn install(
        &self,
        scope: &ScopeConfig,
        target: InstallTarget,
        observer: &dyn InstallObserver,
    ) -> DbcResult<InstallOutcome> {
        let install_root = scope.install_dir()?.to_path_buf();
        let store = scope.store();
        let mut machine = InstallMachine::new(install_root.clone(), self.options.verify_signatures);

        let selection = match target {
            InstallTarget::Resolve { name, constraint } => {
                observer.on_state(&name, InstallState::Searching);
                self.select(&name, constraint.as_ref(), observer).await?
            }
            InstallTarget::Selected(selection) => selection,
        };
        let id = selection.driver.path.clone();
        let existing = store.read(&id)?;

        let mut next = machine.step(InstallEvent::Resolved { selection, existing })?;
        let mut reported = InstallState::Searching;
        while let Some(work) = next {
            if machine.state() != reported {
                reported = machine.state();
                observer.on_state(&id, reported);
            }
            let event = match work {
                InstallWork::Download(selection) => {
                    InstallEvent::Downloaded(self.download(&selection, observer).await?)
                }
                InstallWork::Install {
                    archive,
                    target_dir,
                    replace,
                } => {
                    if let Some(old) = replace {
                        tracing::info!("Removing {} {} before upgrade", old.id, old.version);
                        remove_installed(store.as_ref(), &old)?;
                    }
                    prepare_install_root(&install_root)?;
                    InstallEvent::Installed(unpack(archive, &target_dir)?)
                }
                InstallWork::Verify {
                    extracted,
                    require_signature,
                } => {
                    if let Err(e) = self.verify(&extracted, require_signature, observer) {
                        if let Err(cleanup) = remove_dir_if_exists(&extracted.dir) {
                            tracing::warn!(
                                "Failed to remove {}: {}",
                                extracted.dir.display(),
                                cleanup
                            );
                        }
                        return Err(e);
                    }
                    InstallEvent::Verified(extracted)
                }
                InstallWork::Persist { record } => {
                    let library = record.library_path(&self.platform).ok_or_else(|| {
                        DbcError::Package(format!("{} has no library for {}", record.id, self.platform))
                    })?;
                    let checksum = file_checksum(&library)?;
                    store.write(&record)?;
                    InstallEvent::Persisted { record, checksum }
                }
            };
            next = machine.step(event)?;
        }

        observer.on_state(&id, InstallState::Done);
        machine.into_outcome()
    }

    async fn download(
        &self,
        selection: &PackageSelection,
        observer: &dyn InstallObserver,
    ) -> DbcResult<DownloadedPackage> {
        let mut events = self.downloader.spawn(selection);
        while let Some(event) = events.recv().await {
            match event {
                DownloadEvent::Progress { downloaded, total } => {
                    observer.on_download_progress(&selection.driver.path, downloaded, total);
                }
                DownloadEvent::Finished(result) => return result,
            }
        }
        Err(DbcError::Package(format!(
            "download of {} stopped without a result",
            selection.url
        )))
    }

    fn verify(
        &self,
        extracted: &ExtractedPackage,
        require_signature: bool,
        observer: &dyn InstallObserver,
    ) -> DbcResult<()> {
        let library = extracted.library_path();
        let subject = extracted.manifest.files.driver.clone();

        let signature_path = match extracted.signature_path() {
            Some(path) if path.is_file() => path,
            _ if require_signature => return Err(DbcError::SignatureMissing(subject)),
            _ => {
                let warning = DbcError::SignatureMissing(subject);
                tracing::warn!("{}", warning);
                observer.on_warning(&warning);
                return Ok(());
            }
        };

        let library_bytes = fs::read(&library)?;
        let signature = fs::read(&signature_path)?;
        self.verifier.verify(&subject, &library_bytes, &signature)?;
        tracing::debug!("Verified signature of {}", library.display());
        Ok(())
    }
}

fn unpack(archive: DownloadedPackage, target_dir: &Path) -> DbcResult<ExtractedPackage> {
    let result = PackageExtractor::extract(archive.path(), target_dir);
    if let Err(e) = archive.cleanup() {
        tracing::warn!("Failed to remove downloaded archive: {}", e);
    }
    result
}

/// Create the scope directory, seeding a `.gitignore` when it is new
fn prepare_install_root(root: &Path) -> DbcResult<()> {
    if !ensure_dir(root)? {
        return Ok(());
    }

    let gitignore = root.join(".gitignore");
    match OpenOptions::new().write(true).create_new(true).open(&gitignore) {
        Ok(mut file) => {
            file.write_all(GITIGNORE_CONTENT.as_bytes())?;
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Delete a record and the files it points at.
///
/// A dbc-managed library living in its own `<id>_*` directory directly below
/// one of the store's directories takes that directory with it. Anything else
/// only loses the library file, so a flat layout never removes the scope.
pub fn remove_installed(store: &dyn ManifestStore, record: &InstalledDriver) -> DbcResult<()> {
    store.delete(record)?;

    for shared in record.driver.shared.paths() {
        let library = Path::new(shared);
        match owned_install_dir(store.search_paths(), record, library) {
            Some(dir) => remove_dir_if_exists(dir)?,
            None => remove_file_if_exists(library)?,
        }
    }
    Ok(())
}

/// The per-driver directory dbc created for `library`, if that is where it lives
fn owned_install_dir<'a>(
    roots: &[PathBuf],
    record: &InstalledDriver,
    library: &'a Path,
) -> Option<&'a Path> {
    if !record.is_dbc_managed() {
        return None;
    }
    let dir = library.parent()?;
    let name = dir.file_name()?.to_str()?;
    if !name.starts_with(&format!("{}_", record.id)) {
        return None;
    }

    let parent = dir.parent()?;
    let below_root = roots.iter().any(|root| {
        root == parent
            || matches!(
                (fs::canonicalize(root), fs::canonicalize(parent)),
                (Ok(a), Ok(b)) if a == b
            )
    });
    if !below_root {
        tracing::warn!(
            "Not removing {}: it is not a dbc install directory",
            dir.display()
        );
        return None;
    }
    Some(dir)
}

/// Remove `id` from `scope`. Returns the removed record, or `None` when the
/// driver was not installed there.
pub fn uninstall(scope: &ScopeConfig, id: &str) -> DbcResult<Option<InstalledDriver>> {
    let store = scope.store();
    let Some(record) = store.read(id)? else {
        return Ok(None);
    };
    remove_installed(store.as_ref(), &record)?;
    tracing::info!("Uninstalled {} {} from {}", id, record.version, scope.location);
    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InstallScope, LocationResolver, MapEnv};
    use dbc_core::package::manifest::{DriverEntry, SharedLibraries, DBC_SOURCE};
    use semver::Version;
    use tempfile::TempDir;

    fn user_scope(dir: &Path) -> ScopeConfig {
        LocationResolver::new(MapEnv::new(), dir.to_path_buf(), dir.join("system"))
            .resolve_scope(InstallScope::User)
    }

    fn installed(root: &Path, id: &str, source: &str) -> InstalledDriver {
        let lib_dir = root.join(format!("{}_linux_amd64_v1.0.0", id));
        fs::create_dir_all(&lib_dir).unwrap();
        let lib = lib_dir.join(format!("lib{}.so", id));
        fs::write(&lib, b"lib").unwrap();

        let mut shared = SharedLibraries::default();
        shared.set("linux_amd64", lib.to_string_lossy().into_owned());
        InstalledDriver {
            id: id.to_string(),
            manifest_version: 1,
            name: id.to_string(),
            publisher: String::new(),
            license: String::new(),
            version: Version::new(1, 0, 0),
            source: source.to_string(),
            adbc: Default::default(),
            driver: DriverEntry {
                entrypoint: None,
                shared,
            },
        }
    }

    #[test]
    fn test_uninstall_dbc_managed_removes_directory() {
        let temp = TempDir::new().unwrap();
        let scope = user_scope(temp.path());
        let record = installed(temp.path(), "sqlite", DBC_SOURCE);
        scope.store().write(&record).unwrap();

        let removed = uninstall(&scope, "sqlite").unwrap().unwrap();
        assert_eq!(removed.version, Version::new(1, 0, 0));
        assert!(!temp.path().join("sqlite.toml").exists());
        assert!(!temp.path().join("sqlite_linux_amd64_v1.0.0").exists());
    }

    #[test]
    fn test_uninstall_foreign_record_keeps_directory() {
        let temp = TempDir::new().unwrap();
        let scope = user_scope(temp.path());
        let record = installed(temp.path(), "oracle", "manual");
        scope.store().write(&record).unwrap();

        uninstall(&scope, "oracle").unwrap();
        let dir = temp.path().join("oracle_linux_amd64_v1.0.0");
        assert!(dir.is_dir());
        assert!(!dir.join("liboracle.so").exists());
    }

    fn with_library(mut record: InstalledDriver, library: &Path) -> InstalledDriver {
        let mut shared = SharedLibraries::default();
        shared.set("linux_amd64", library.to_string_lossy().into_owned());
        record.driver.shared = shared;
        record
    }

    #[test]
    fn test_uninstall_flat_layout_keeps_scope() {
        let temp = TempDir::new().unwrap();
        let scope = user_scope(temp.path());
        let store = scope.store();

        let other = installed(temp.path(), "other", DBC_SOURCE);
        store.write(&other).unwrap();

        let library = temp.path().join("libflat.so");
        fs::write(&library, b"lib").unwrap();
        let flat = with_library(installed(temp.path(), "flat", DBC_SOURCE), &library);
        store.write(&flat).unwrap();

        uninstall(&scope, "flat").unwrap().unwrap();

        assert!(temp.path().is_dir());
        assert!(!library.exists());
        assert!(!temp.path().join("flat.toml").exists());
        assert!(temp.path().join("other.toml").is_file());
        assert!(temp.path().join("other_linux_amd64_v1.0.0").is_dir());
    }

    #[test]
    fn test_uninstall_keeps_directory_outside_scope() {
        let temp = TempDir::new().unwrap();
        let scope_dir = temp.path().join("scope");
        let scope = user_scope(&scope_dir);

        let elsewhere = temp.path().join("elsewhere");
        let record = installed(&elsewhere, "sqlite", DBC_SOURCE);
        scope.store().write(&record).unwrap();

        uninstall(&scope, "sqlite").unwrap();

        let dir = elsewhere.join("sqlite_linux_amd64_v1.0.0");
        assert!(dir.is_dir());
        assert!(!dir.join("libsqlite.so").exists());
    }

    #[test]
    fn test_uninstall_missing_is_noop() {
        let temp = TempDir::new().unwrap();
        let scope = user_scope(temp.path());
        assert!(uninstall(&scope, "nothing").unwrap().is_none());
    }

    #[test]
    fn test_gitignore_only_for_new_directory() {
        let temp = TempDir::new().unwrap();

        let fresh = temp.path().join("fresh");
        prepare_install_root(&fresh).unwrap();
        assert_eq!(
            fs::read_to_string(fresh.join(".gitignore")).unwrap(),
            GITIGNORE_CONTENT
        );

        let existing = temp.path().join("existing");
        fs::create_dir_all(&existing).unwrap();
        prepare_install_root(&existing).unwrap();
        assert!(!existing.join(".gitignore").exists());
    }

    #[test]
    fn test_gitignore_never_overwritten() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("drivers");
        prepare_install_root(&root).unwrap();
        fs::write(root.join(".gitignore"), "custom\n").unwrap();
        prepare_install_root(&root).unwrap();
        assert_eq!(fs::read_to_string(root.join(".gitignore")).unwrap(), "custom\n");
    }
}
