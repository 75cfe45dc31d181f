use crate::config::{Environment, InstallScope, ProcessEnv};
use crate::core::path::settings_file;
use crate::core::{DbcError, DbcResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "https://dbc-cdn.columnar.tech";
pub const BASE_URL_VAR: &str = "DBC_BASE_URL";

/// A registry to pull driver indexes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySource {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registries in priority order; earlier ones win when two list the same driver
    #[serde(default = "default_registries")]
    pub registries: Vec<RegistrySource>,

    /// Level used when a command gets no `--level`
    #[serde(default = "default_level")]
    pub default_level: String,

    /// Whether to require valid package signatures on install
    #[serde(default = "default_true")]
    pub verify_signatures: bool,
}

fn default_registries() -> Vec<RegistrySource> {
    vec![RegistrySource {
        name: "public".to_string(),
        base_url: DEFAULT_BASE_URL.to_string(),
    }]
}

fn default_level() -> String {
    InstallScope::User.as_str().to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registries: default_registries(),
            default_level: default_level(),
            verify_signatures: true,
        }
    }
}

impl Settings {
    /// Load settings from the platform config directory and apply environment overrides.
    ///
    /// A missing file yields defaults; nothing is written.
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\Columnar\dbc\config.yaml
    /// - Linux: ~/.config/columnar/dbc/config.yaml
    /// - macOS: ~/Library/Application Support/Columnar/dbc/config.yaml
    pub fn load() -> DbcResult<Self> {
        let mut settings = Self::load_from(&settings_file()?)?;
        settings.apply_env(&ProcessEnv);
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> DbcResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)
            .map_err(|e| DbcError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        if settings.registries.is_empty() {
            return Err(DbcError::Config(format!(
                "{} lists no registries",
                path.display()
            )));
        }

        Ok(settings)
    }

    /// `DBC_BASE_URL` replaces the configured registries with a single one
    pub fn apply_env(&mut self, env: &dyn Environment) {
        if let Some(url) = env.var(BASE_URL_VAR) {
            tracing::debug!("Using registry from {}: {}", BASE_URL_VAR, url);
            self.registries = vec![RegistrySource {
                name: "default".to_string(),
                base_url: url,
            }];
        }
    }

    pub fn default_level(&self) -> DbcResult<InstallScope> {
        self.default_level.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnv;
    use tempfile::TempDir;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.registries.len(), 1);
        assert_eq!(settings.registries[0].base_url, DEFAULT_BASE_URL);
        assert!(settings.verify_signatures);
        assert_eq!(settings.default_level().unwrap(), InstallScope::User);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.registries[0].name, "public");
        assert!(!path.exists());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "registries:\n  - name: private\n    base_url: https://dbc-cdn-private.columnar.tech\nverify_signatures: false\n",
        )
        .unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.registries.len(), 1);
        assert_eq!(loaded.registries[0].name, "private");
        assert!(!loaded.verify_signatures);
        assert_eq!(loaded.default_level().unwrap(), InstallScope::User);
    }

    #[test]
    fn test_base_url_override() {
        let mut settings = Settings::default();
        settings.apply_env(&MapEnv::new().with(BASE_URL_VAR, "http://localhost:8080"));
        assert_eq!(settings.registries.len(), 1);
        assert_eq!(settings.registries[0].base_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_registry_list_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "registries: []\n").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(DbcError::Config(_))));
    }
}
