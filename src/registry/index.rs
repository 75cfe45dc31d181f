use crate::core::version::parse_loose_version;
use crate::core::{DbcError, DbcResult};
use crate::registry::Registry;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Weak};

/// `<base>/index.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

/// A driver as listed by a registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    #[serde(rename = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub license: String,
    /// Unique short name, e.g. `flightsql`
    pub path: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, rename = "pkginfo", deserialize_with = "lenient_versions")]
    pub versions: Vec<PackageVersion>,
    #[serde(skip)]
    pub(crate) registry: Weak<Registry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageVersion {
    pub version: Version,
    #[serde(default)]
    pub packages: Vec<PlatformPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformPackage {
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct RawPackageVersion {
    version: String,
    #[serde(default)]
    packages: Vec<PlatformPackage>,
}

/// Entries whose version does not parse are dropped with a warning
fn lenient_versions<'de, D>(deserializer: D) -> Result<Vec<PackageVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<RawPackageVersion>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| match parse_loose_version(&entry.version) {
            Ok(version) => Some(PackageVersion {
                version,
                packages: entry.packages,
            }),
            Err(e) => {
                tracing::warn!("Skipping registry entry: {}", e);
                None
            }
        })
        .collect())
}

impl PackageVersion {
    pub fn package_for(&self, platform: &str) -> Option<&PlatformPackage> {
        self.packages.iter().find(|p| p.platform == platform)
    }
}

impl Driver {
    /// Registry this driver was fetched from
    pub fn registry(&self) -> DbcResult<Arc<Registry>> {
        self.registry.upgrade().ok_or_else(|| {
            DbcError::Package(format!(
                "registry for driver '{}' is no longer loaded",
                self.path
            ))
        })
    }

    /// Versions offered for a platform, ascending
    pub fn versions_for(&self, platform: &str) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self
            .versions
            .iter()
            .filter(|v| v.package_for(platform).is_some())
            .map(|v| &v.version)
            .collect();
        versions.sort();
        versions
    }

    pub fn find_version(&self, version: &Version) -> Option<&PackageVersion> {
        self.versions.iter().find(|v| v.version == *version)
    }

    /// Download URL for one version/platform of this driver
    pub fn package_url(&self, version: &PackageVersion, platform: &str) -> DbcResult<String> {
        if version.packages.is_empty() {
            return Err(DbcError::Package(format!(
                "no packages available for {} version {}",
                self.path, version.version
            )));
        }
        let package = version.package_for(platform).ok_or_else(|| {
            DbcError::Package(format!(
                "no package of {} {} for platform '{}'",
                self.path, version.version, platform
            ))
        })?;

        let registry = self.registry()?;
        Ok(package_url(
            &registry.base_url,
            &self.path,
            &version.version,
            platform,
            package.url.as_deref(),
        ))
    }
}

/// Resolve a package URL.
///
/// Absolute URLs are used as-is, relative ones are joined to the registry
/// base, and a missing URL falls back to
/// `<base>/<path>/<version>/<path>_<platform>-<version>.tar.gz`.
pub fn package_url(
    base_url: &str,
    driver_path: &str,
    version: &Version,
    platform: &str,
    url: Option<&str>,
) -> String {
    match url.filter(|u| !u.is_empty()) {
        Some(url) if reqwest::Url::parse(url).is_ok() => url.to_string(),
        Some(relative) => join_url(base_url, relative),
        None => join_url(
            base_url,
            &format!(
                "{path}/{version}/{path}_{platform}-{version}.tar.gz",
                path = driver_path,
                version = version,
                platform = platform
            ),
        ),
    }
}

fn join_url(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
