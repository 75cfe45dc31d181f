//! Install scopes and where each one keeps its driver manifests.

pub mod settings;

use crate::core::path::{join_path_list, split_path_list, system_drivers_dir, user_drivers_dir};
use crate::core::{DbcError, DbcResult};
use crate::store::{store_for, ManifestStore};
use dbc_core::InstalledDriver;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use settings::{RegistrySource, Settings};

pub const DRIVER_PATH_VAR: &str = "ADBC_DRIVER_PATH";
pub const VIRTUAL_ENV_VAR: &str = "VIRTUAL_ENV";
pub const CONDA_PREFIX_VAR: &str = "CONDA_PREFIX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstallScope {
    System,
    User,
    PerEnvironment,
}

impl InstallScope {
    pub const ALL: [InstallScope; 3] = [
        InstallScope::PerEnvironment,
        InstallScope::User,
        InstallScope::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallScope::System => "system",
            InstallScope::User => "user",
            InstallScope::PerEnvironment => "env",
        }
    }
}

impl fmt::Display for InstallScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallScope {
    type Err = DbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(InstallScope::System),
            "user" => Ok(InstallScope::User),
            "env" | "environment" | "venv" => Ok(InstallScope::PerEnvironment),
            other => Err(DbcError::Config(format!(
                "Unknown install level '{}'. Expected one of: system, user, env",
                other
            ))),
        }
    }
}

/// Source of environment variables. Tests substitute a fixed map.
pub trait Environment: Send + Sync {
    /// Value of `key`; unset and empty values are both `None`
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// Fixed set of variables
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

impl Environment for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolved state of one install scope
#[derive(Debug)]
pub struct ScopeConfig {
    pub level: InstallScope,
    /// Human-readable location: a directory, a path list, or a registry key
    pub location: String,
    /// Directories in lookup order; the first is where installs go
    pub search_paths: Vec<PathBuf>,
    pub drivers: BTreeMap<String, InstalledDriver>,
    pub exists: bool,
    /// Set when enumeration failed for a reason other than a missing directory
    pub error: Option<DbcError>,
    /// Manifests that could not be read; the rest are still listed
    pub problems: Vec<DbcError>,
}

impl ScopeConfig {
    /// Directory new drivers are installed into
    pub fn install_dir(&self) -> DbcResult<&Path> {
        self.search_paths.first().map(PathBuf::as_path).ok_or_else(|| {
            DbcError::Path(format!(
                "no install location for the {} level: set {}, {} or {}",
                self.level, DRIVER_PATH_VAR, VIRTUAL_ENV_VAR, CONDA_PREFIX_VAR
            ))
        })
    }

    pub fn store(&self) -> Box<dyn ManifestStore> {
        store_for(self.level, self.search_paths.clone())
    }

    pub fn installed(&self, id: &str) -> Option<&InstalledDriver> {
        self.drivers.get(id)
    }
}

/// Maps install scopes to locations on this machine
pub struct LocationResolver<E: Environment = ProcessEnv> {
    env: E,
    user_dir: PathBuf,
    system_dir: PathBuf,
}

impl LocationResolver<ProcessEnv> {
    /// Resolver for the running process and the platform's conventional directories
    pub fn from_process() -> DbcResult<Self> {
        Ok(Self::new(ProcessEnv, user_drivers_dir()?, system_drivers_dir()))
    }
}

impl<E: Environment> LocationResolver<E> {
    pub fn new(env: E, user_dir: PathBuf, system_dir: PathBuf) -> Self {
        Self {
            env,
            user_dir,
            system_dir,
        }
    }

    /// Directories for a scope, highest precedence first.
    ///
    /// The per-environment scope concatenates every variable that is set:
    /// `ADBC_DRIVER_PATH` entries, then `$VIRTUAL_ENV/etc/adbc/drivers`, then
    /// `$CONDA_PREFIX/etc/adbc/drivers`. Nothing set means no directories.
    pub fn search_paths(&self, scope: InstallScope) -> Vec<PathBuf> {
        match scope {
            InstallScope::System => vec![self.system_dir.clone()],
            InstallScope::User => vec![self.user_dir.clone()],
            InstallScope::PerEnvironment => {
                let mut paths = Vec::new();
                if let Some(list) = self.env.var(DRIVER_PATH_VAR) {
                    paths.extend(split_path_list(&list));
                }
                for var in [VIRTUAL_ENV_VAR, CONDA_PREFIX_VAR] {
                    if let Some(prefix) = self.env.var(var) {
                        paths.push(env_drivers_dir(Path::new(&prefix)));
                    }
                }
                paths
            }
        }
    }

    /// Display location for a scope
    pub fn location(&self, scope: InstallScope) -> String {
        if cfg!(windows) && scope != InstallScope::PerEnvironment {
            return crate::store::registry_location(scope);
        }
        let paths = self.search_paths(scope);
        match join_path_list(&paths) {
            Ok(joined) => joined.to_string_lossy().into_owned(),
            Err(_) => paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Resolve a scope and enumerate its installed drivers.
    ///
    /// A missing directory yields `exists = false` and no drivers; other
    /// failures land in `error`.
    pub fn resolve_scope(&self, scope: InstallScope) -> ScopeConfig {
        let search_paths = self.search_paths(scope);
        let mut config = ScopeConfig {
            level: scope,
            location: self.location(scope),
            search_paths,
            drivers: BTreeMap::new(),
            exists: false,
            error: None,
            problems: Vec::new(),
        };

        match config.store().list_all() {
            Ok(listing) => {
                config.exists = listing.exists;
                config.drivers = listing.drivers;
                config.problems = listing.problems;
            }
            Err(e) => {
                tracing::warn!("Failed to enumerate {} drivers: {}", scope, e);
                config.error = Some(e);
            }
        }

        config
    }
}

/// `<prefix>/etc/adbc/drivers`
pub fn env_drivers_dir(prefix: &Path) -> PathBuf {
    prefix.join("etc").join("adbc").join("drivers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver(env: MapEnv) -> LocationResolver<MapEnv> {
        LocationResolver::new(env, PathBuf::from("/u/drivers"), PathBuf::from("/s/drivers"))
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("user".parse::<InstallScope>().unwrap(), InstallScope::User);
        assert_eq!("System".parse::<InstallScope>().unwrap(), InstallScope::System);
        assert_eq!("env".parse::<InstallScope>().unwrap(), InstallScope::PerEnvironment);
        assert!("global".parse::<InstallScope>().is_err());
    }

    #[test]
    fn test_env_override_only() {
        let r = resolver(MapEnv::new().with(DRIVER_PATH_VAR, "/custom/drivers"));
        assert_eq!(
            r.search_paths(InstallScope::PerEnvironment),
            vec![PathBuf::from("/custom/drivers")]
        );
    }

    #[test]
    fn test_venv_only() {
        let r = resolver(MapEnv::new().with(VIRTUAL_ENV_VAR, "/work/.venv"));
        assert_eq!(
            r.search_paths(InstallScope::PerEnvironment),
            vec![PathBuf::from("/work/.venv/etc/adbc/drivers")]
        );
    }

    #[test]
    fn test_conda_only() {
        let r = resolver(MapEnv::new().with(CONDA_PREFIX_VAR, "/opt/conda"));
        assert_eq!(
            r.search_paths(InstallScope::PerEnvironment),
            vec![PathBuf::from("/opt/conda/etc/adbc/drivers")]
        );
    }

    #[test]
    fn test_none_set_is_empty() {
        let r = resolver(MapEnv::new().with(VIRTUAL_ENV_VAR, ""));
        assert!(r.search_paths(InstallScope::PerEnvironment).is_empty());

        let scope = r.resolve_scope(InstallScope::PerEnvironment);
        assert!(!scope.exists);
        assert!(scope.drivers.is_empty());
        assert!(scope.install_dir().is_err());
    }

    #[test]
    fn test_precedence_order() {
        let r = resolver(
            MapEnv::new()
                .with(CONDA_PREFIX_VAR, "/opt/conda")
                .with(VIRTUAL_ENV_VAR, "/work/.venv")
                .with(DRIVER_PATH_VAR, "/custom/drivers"),
        );
        assert_eq!(
            r.search_paths(InstallScope::PerEnvironment),
            vec![
                PathBuf::from("/custom/drivers"),
                PathBuf::from("/work/.venv/etc/adbc/drivers"),
                PathBuf::from("/opt/conda/etc/adbc/drivers"),
            ]
        );
    }

    #[test]
    fn test_fixed_scopes() {
        let r = resolver(MapEnv::new());
        assert_eq!(r.search_paths(InstallScope::User), vec![PathBuf::from("/u/drivers")]);
        assert_eq!(r.search_paths(InstallScope::System), vec![PathBuf::from("/s/drivers")]);
    }

    #[test]
    fn test_missing_directory_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let r = LocationResolver::new(
            MapEnv::new(),
            temp.path().join("does-not-exist"),
            temp.path().join("also-missing"),
        );
        let scope = r.resolve_scope(InstallScope::User);
        assert!(!scope.exists);
        assert!(scope.error.is_none());
        assert!(scope.drivers.is_empty());
    }
}
