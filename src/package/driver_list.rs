use crate::core::version::DriverConstraint;
use crate::core::{DbcError, DbcResult};
use crate::package::selection;
use crate::registry::DriverRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_LIST_PATH: &str = "./dbc.toml";
pub const LIST_FILE_NAME: &str = "dbc.toml";

const LIST_HEADER: &str = "# dbc driver list\n\n";
const ALLOW_PRERELEASE: &str = "allow";

/// One `[drivers.<name>]` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,
}

impl DriverSpec {
    pub fn new(constraint: Option<&DriverConstraint>, allow_prerelease: bool) -> Self {
        Self {
            version: constraint.map(|c| c.to_string()),
            prerelease: allow_prerelease.then(|| ALLOW_PRERELEASE.to_string()),
        }
    }

    pub fn constraint(&self) -> DbcResult<Option<DriverConstraint>> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(DriverConstraint::parse)
            .transpose()
    }

    pub fn allows_prerelease(&self) -> bool {
        self.prerelease.as_deref() == Some(ALLOW_PRERELEASE)
    }

    /// Constraint text for messages; "any" when unconstrained
    pub fn describe(&self) -> &str {
        self.version.as_deref().unwrap_or("any")
    }
}

/// The declarative `dbc.toml` driver list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverList {
    #[serde(default)]
    pub drivers: BTreeMap<String, DriverSpec>,
}

impl DriverList {
    /// `path` itself, or `<path>/dbc.toml` when it has no extension
    pub fn resolve_path(path: &Path) -> PathBuf {
        if path.extension().is_none() {
            path.join(LIST_FILE_NAME)
        } else {
            path.to_path_buf()
        }
    }

    /// Create an empty list. An existing file is left alone and reported.
    pub fn init(path: &Path) -> DbcResult<PathBuf> {
        let path = Self::resolve_path(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(DbcError::Config(format!(
                    "{} already exists",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(format!("{}[drivers]\n", LIST_HEADER).as_bytes())?;
        Ok(path)
    }

    pub fn load(path: &Path) -> DbcResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DbcError::Package(format!(
                    "driver list not found at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| {
            DbcError::Package(format!("Could not decode driver list {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> DbcResult<()> {
        let body = toml::to_string(self)?;
        let body = if self.drivers.is_empty() {
            "[drivers]\n".to_string()
        } else {
            body
        };
        fs::write(path, format!("{}{}", LIST_HEADER, body))?;
        Ok(())
    }

    /// Insert or replace an entry, returning the one it replaced
    pub fn add(&mut self, name: &str, spec: DriverSpec) -> Option<DriverSpec> {
        self.drivers.insert(name.to_string(), spec)
    }

    pub fn remove(&mut self, name: &str) -> DbcResult<DriverSpec> {
        self.drivers
            .remove(name)
            .ok_or_else(|| DbcError::NotFound(format!("{} (not in the driver list)", name)))
    }
}

/// Check that `name` is published and, when `spec` carries a constraint, that
/// some version satisfies it on `platform`. Returns any partial-registry warning.
pub async fn check_available(
    registry: &DriverRegistry,
    name: &str,
    spec: &DriverSpec,
    platform: &str,
) -> DbcResult<Option<DbcError>> {
    let (driver, warning) = registry.find(name).await?;
    if let Some(constraint) = spec.constraint()? {
        selection::resolve(&driver, Some(&constraint), platform, spec.allows_prerelease())?;
    }
    Ok(warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path() {
        assert_eq!(
            DriverList::resolve_path(Path::new("project")),
            PathBuf::from("project/dbc.toml")
        );
        assert_eq!(
            DriverList::resolve_path(Path::new("drivers.toml")),
            PathBuf::from("drivers.toml")
        );
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let path = DriverList::init(temp.path()).unwrap();
        assert_eq!(path, temp.path().join("dbc.toml"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# dbc driver list"));
        assert!(DriverList::load(&path).unwrap().drivers.is_empty());

        assert!(matches!(DriverList::init(&path), Err(DbcError::Config(_))));
    }

    #[test]
    fn test_add_replace_remove() {
        let temp = TempDir::new().unwrap();
        let path = DriverList::init(temp.path()).unwrap();

        let mut list = DriverList::load(&path).unwrap();
        let constraint = DriverConstraint::parse(">=1.0.0").unwrap();
        assert!(list.add("sqlite", DriverSpec::new(Some(&constraint), false)).is_none());
        assert!(list.add("duckdb", DriverSpec::default()).is_none());
        list.save(&path).unwrap();

        let mut list = DriverList::load(&path).unwrap();
        let names: Vec<_> = list.drivers.keys().cloned().collect();
        assert_eq!(names, vec!["duckdb", "sqlite"]);
        assert_eq!(list.drivers["sqlite"].describe(), ">=1.0.0");
        assert_eq!(list.drivers["duckdb"].describe(), "any");

        let old = list.add("sqlite", DriverSpec::new(None, true)).unwrap();
        assert_eq!(old.version.as_deref(), Some(">=1.0.0"));
        assert!(list.drivers["sqlite"].allows_prerelease());

        list.remove("duckdb").unwrap();
        assert!(list.remove("duckdb").is_err());
    }

    #[test]
    fn test_spec_constraint() {
        let spec = DriverSpec {
            version: Some("<2.0.0".to_string()),
            prerelease: None,
        };
        let constraint = spec.constraint().unwrap().unwrap();
        assert!(constraint.matches(&Version::new(1, 9, 0), false));
        assert!(!spec.allows_prerelease());

        assert!(DriverSpec::default().constraint().unwrap().is_none());
    }

    #[test]
    fn test_load_missing_list() {
        let temp = TempDir::new().unwrap();
        let err = DriverList::load(&temp.path().join("dbc.toml")).unwrap_err();
        assert!(err.to_string().contains("driver list not found"));
    }

    #[test]
    fn test_parse_handwritten_list() {
        let list: DriverList = toml::from_str(
            r#"
[drivers]
sqlite = {}

[drivers.duckdb]
version = ">=1.1"
prerelease = "allow"
"#,
        )
        .unwrap();
        assert_eq!(list.drivers.len(), 2);
        assert!(list.drivers["duckdb"].allows_prerelease());
        assert!(list.drivers["sqlite"].version.is_none());
    }
}
