use crate::core::version::DriverConstraint;
use crate::core::{DbcError, DbcResult};
use crate::registry::Driver;
use semver::Version;

/// One concrete artifact: a driver version built for a platform
#[derive(Debug, Clone)]
pub struct PackageSelection {
    pub driver: Driver,
    pub version: Version,
    pub platform: String,
    pub url: String,
}

impl PackageSelection {
    /// Directory name the package is extracted into
    pub fn install_dir_name(&self) -> String {
        format!("{}_{}_v{}", self.driver.path, self.platform, self.version)
    }
}

/// Pick the greatest version of `driver` that satisfies `constraint` and has
/// a package for `platform`. Without a constraint any version qualifies;
/// prereleases only when `allow_prerelease` is set.
pub fn resolve(
    driver: &Driver,
    constraint: Option<&DriverConstraint>,
    platform: &str,
    allow_prerelease: bool,
) -> DbcResult<PackageSelection> {
    let chosen = driver
        .versions
        .iter()
        .filter(|pv| pv.package_for(platform).is_some())
        .filter(|pv| match constraint {
            Some(c) => c.matches(&pv.version, allow_prerelease),
            None => allow_prerelease || pv.version.pre.is_empty(),
        })
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| DbcError::NoSatisfyingVersion {
            driver: driver.path.clone(),
            constraint: constraint.map_or_else(|| "*".to_string(), |c| c.to_string()),
            platform: platform.to_string(),
        })?;

    let url = driver.package_url(chosen, platform)?;
    tracing::debug!("Selected {} {} for {}: {}", driver.path, chosen.version, platform, url);

    Ok(PackageSelection {
        driver: driver.clone(),
        version: chosen.version.clone(),
        platform: platform.to_string(),
        url,
    })
}

/// Select exactly `version`, e.g. a version pinned by a lock file
pub fn resolve_exact(driver: &Driver, version: &Version, platform: &str) -> DbcResult<PackageSelection> {
    let pinned = driver.find_version(version).ok_or_else(|| DbcError::NoSatisfyingVersion {
        driver: driver.path.clone(),
        constraint: format!("={}", version),
        platform: platform.to_string(),
    })?;

    if pinned.package_for(platform).is_none() && !pinned.packages.is_empty() {
        return Err(DbcError::NoSatisfyingVersion {
            driver: driver.path.clone(),
            constraint: format!("={}", version),
            platform: platform.to_string(),
        });
    }

    let url = driver.package_url(pinned, platform)?;
    Ok(PackageSelection {
        driver: driver.clone(),
        version: pinned.version.clone(),
        platform: platform.to_string(),
        url,
    })
}
