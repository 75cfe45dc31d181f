use crate::core::{DbcError, DbcResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Newest installed-manifest layout this build reads and writes
pub const MANIFEST_VERSION: u32 = 1;

/// Source tag for drivers installed by dbc itself
pub const DBC_SOURCE: &str = "dbc";

fn default_manifest_version() -> u32 {
    1
}

/// Record of one installed driver in one install scope (`<id>.toml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledDriver {
    /// Driver id, taken from the manifest file name or registry key
    #[serde(skip)]
    pub id: String,
    #[serde(default = "default_manifest_version")]
    pub manifest_version: u32,
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub license: String,
    pub version: Version,
    #[serde(default)]
    pub source: String,
    #[serde(rename = "ADBC", default, skip_serializing_if = "AdbcInfo::is_empty")]
    pub adbc: AdbcInfo,
    #[serde(rename = "Driver", default)]
    pub driver: DriverEntry,
}

/// ADBC API level the driver implements
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdbcInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Features::is_empty")]
    pub features: Features,
}

impl AdbcInfo {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.features.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsupported: Vec<String>,
}

impl Features {
    pub fn is_empty(&self) -> bool {
        self.supported.is_empty() && self.unsupported.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub shared: SharedLibraries,
}

/// Shared library location(s): a single path or one path per platform tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SharedLibraries {
    Single(String),
    PerPlatform(BTreeMap<String, String>),
}

impl Default for SharedLibraries {
    fn default() -> Self {
        SharedLibraries::PerPlatform(BTreeMap::new())
    }
}

impl SharedLibraries {
    /// Library for a platform. A single path applies to every platform.
    pub fn get(&self, platform: &str) -> Option<&str> {
        match self {
            SharedLibraries::Single(path) => Some(path.as_str()),
            SharedLibraries::PerPlatform(map) => map.get(platform).map(String::as_str),
        }
    }

    pub fn set(&mut self, platform: &str, path: String) {
        match self {
            SharedLibraries::PerPlatform(map) => {
                map.insert(platform.to_string(), path);
            }
            SharedLibraries::Single(_) => {
                let mut map = BTreeMap::new();
                map.insert(platform.to_string(), path);
                *self = SharedLibraries::PerPlatform(map);
            }
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            SharedLibraries::Single(path) => vec![path.as_str()],
            SharedLibraries::PerPlatform(map) => map.values().map(String::as_str).collect(),
        }
    }
}

impl InstalledDriver {
    /// Parse a manifest, rejecting layouts newer than [`MANIFEST_VERSION`]
    pub fn from_toml_str(id: &str, content: &str, origin: &Path) -> DbcResult<Self> {
        let mut record: InstalledDriver = toml::from_str(content).map_err(|e| {
            DbcError::Package(format!("Failed to parse {}: {}", origin.display(), e))
        })?;

        record.check_manifest_version(origin)?;
        record.id = id.to_string();
        Ok(record)
    }

    pub fn check_manifest_version(&self, origin: &Path) -> DbcResult<()> {
        if self.manifest_version > MANIFEST_VERSION {
            return Err(DbcError::ManifestVersionUnsupported {
                path: origin.display().to_string(),
                found: self.manifest_version,
                supported: MANIFEST_VERSION,
            });
        }
        Ok(())
    }

    /// Serialize in the current layout. Output is stable for equal records.
    pub fn to_toml_string(&self) -> DbcResult<String> {
        let mut record = self.clone();
        record.manifest_version = MANIFEST_VERSION;
        Ok(toml::to_string(&record)?)
    }

    /// Load `<dir>/<id>.toml`
    pub fn load(dir: &Path, id: &str) -> DbcResult<Self> {
        let path = Self::manifest_path(dir, id);
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(id, &content, &path)
    }

    /// Write `<dir>/<id>.toml`
    pub fn save(&self, dir: &Path) -> DbcResult<PathBuf> {
        let path = Self::manifest_path(dir, &self.id);
        std::fs::write(&path, self.to_toml_string()?)?;
        Ok(path)
    }

    pub fn manifest_path(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.toml", id))
    }

    pub fn is_dbc_managed(&self) -> bool {
        self.source == DBC_SOURCE
    }

    pub fn library_path(&self, platform: &str) -> Option<PathBuf> {
        self.driver.shared.get(platform).map(PathBuf::from)
    }
}
