use crate::config::ScopeConfig;
use crate::core::{DbcError, DbcResult};
use crate::package::checksum::file_checksum;
use crate::package::driver_list::DriverList;
use crate::package::installer::{InstallObserver, InstallTarget, Installer};
use crate::package::lockfile::{LockEntry, Lockfile};
use crate::package::machine::InstallStatus;
use crate::package::selection::{self, PackageSelection};
use dbc_core::InstalledDriver;
use semver::Version;
use std::path::{Path, PathBuf};

/// How one declared driver ended up
#[derive(Debug, Clone)]
pub struct SyncedDriver {
    pub name: String,
    pub version: Version,
    pub status: InstallStatus,
    pub replaced: Option<InstalledDriver>,
    pub post_install: Vec<String>,
}

#[derive(Debug)]
pub struct SyncReport {
    pub drivers: Vec<SyncedDriver>,
    pub lock_path: PathBuf,
    pub lock: Lockfile,
    /// Advisory registry failures seen while resolving
    pub warnings: Vec<DbcError>,
}

impl SyncReport {
    pub fn installed_count(&self) -> usize {
        self.drivers
            .iter()
            .filter(|d| d.status == InstallStatus::Installed)
            .count()
    }
}

struct PlannedInstall {
    selection: PackageSelection,
    /// Checksum recorded by the previous sync for this exact version
    expected_checksum: Option<String>,
}

/// Brings a scope in line with a driver list and its lock file
pub struct SyncReconciler<'a> {
    installer: &'a Installer,
}

impl<'a> SyncReconciler<'a> {
    pub fn new(installer: &'a Installer) -> Self {
        Self { installer }
    }

    /// Install everything in the list at `list_path` into `scope`.
    ///
    /// Drivers are handled one at a time in name order and the first failure
    /// stops the run. The lock file is only rewritten after every driver
    /// succeeded.
    pub async fn sync(
        &self,
        list_path: &Path,
        scope: &ScopeConfig,
        observer: &dyn InstallObserver,
    ) -> DbcResult<SyncReport> {
        let list_path = DriverList::resolve_path(list_path);
        let list = DriverList::load(&list_path)?;
        if list.drivers.is_empty() {
            return Err(DbcError::Package(format!(
                "no drivers found in driver list {}",
                list_path.display()
            )));
        }

        let lock_path = Lockfile::path_for(&list_path);
        let previous = Lockfile::load(&lock_path)?;

        let (plan, warnings) = self.plan(&list, &previous).await?;

        let mut drivers = Vec::with_capacity(plan.len());
        let mut entries = Vec::with_capacity(plan.len());
        for item in plan {
            let name = item.selection.driver.path.clone();
            let platform = item.selection.platform.clone();

            let outcome = self
                .installer
                .install(scope, InstallTarget::Selected(item.selection), observer)
                .await?;

            let checksum = match outcome.status {
                InstallStatus::AlreadyInstalled => {
                    let actual = installed_checksum(&outcome.record, &platform)?;
                    if let Some(expected) = item.expected_checksum.filter(|c| !c.is_empty()) {
                        if expected != actual {
                            return Err(DbcError::ChecksumMismatch {
                                driver: name,
                                expected,
                                actual,
                            });
                        }
                    }
                    actual
                }
                InstallStatus::Installed => match outcome.checksum {
                    Some(checksum) => checksum,
                    None => installed_checksum(&outcome.record, &platform)?,
                },
            };

            entries.push(LockEntry {
                name: name.clone(),
                version: outcome.record.version.clone(),
                platform,
                checksum,
            });
            drivers.push(SyncedDriver {
                name,
                version: outcome.record.version.clone(),
                status: outcome.status,
                replaced: outcome.replaced,
                post_install: outcome.post_install,
            });
        }

        let lock = Lockfile {
            drivers: entries,
            ..Lockfile::default()
        };
        lock.save(&lock_path)?;
        tracing::info!("Wrote {} ({} drivers)", lock_path.display(), lock.drivers.len());

        Ok(SyncReport {
            drivers,
            lock_path,
            lock,
            warnings,
        })
    }

    /// Resolve every declared driver before anything is installed
    async fn plan(
        &self,
        list: &DriverList,
        previous: &Lockfile,
    ) -> DbcResult<(Vec<PlannedInstall>, Vec<DbcError>)> {
        let set = self.installer.registry().drivers().await?;
        let platform = self.installer.platform();
        let default_prerelease = self.installer.options().allow_prerelease;

        let mut plan = Vec::with_capacity(list.drivers.len());
        for (name, spec) in &list.drivers {
            let driver = set
                .drivers
                .iter()
                .find(|d| &d.path == name)
                .ok_or_else(|| DbcError::NotFound(name.clone()))?;
            let constraint = spec.constraint()?;
            let allow_prerelease = default_prerelease || spec.allows_prerelease();

            let locked = previous.get(name).filter(|entry| {
                constraint
                    .as_ref()
                    .map_or(true, |c| c.matches(&entry.version, allow_prerelease))
            });

            let selection = match locked {
                Some(entry) => {
                    tracing::debug!("{} pinned to {} by lock file", name, entry.version);
                    selection::resolve_exact(driver, &entry.version, platform)?
                }
                None => selection::resolve(driver, constraint.as_ref(), platform, allow_prerelease)?,
            };

            // A checksum only means something for the platform it was taken on
            let expected_checksum = locked
                .filter(|entry| entry.platform == platform)
                .map(|entry| entry.checksum.clone());

            plan.push(PlannedInstall {
                selection,
                expected_checksum,
            });
        }

        Ok((plan, set.warning.into_iter().collect()))
    }
}

fn installed_checksum(record: &InstalledDriver, platform: &str) -> DbcResult<String> {
    let library = record.library_path(platform).ok_or_else(|| {
        DbcError::Package(format!(
            "installed record for {} has no library for {}",
            record.id, platform
        ))
    })?;
    file_checksum(&library)
}
