//! Remote driver registries and the resolver that queries all of them.

pub mod auth;
pub mod http;
pub mod index;
pub mod search;

use crate::config::{RegistrySource, Settings};
use crate::core::{DbcError, DbcResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

pub use auth::{AuthenticatedFetcher, Credential, CredentialProvider, KeyringCredentials, NoCredentials};
pub use http::{DownloadProgress, HttpClient, HttpResponse, ReqwestHttpClient};
pub use index::{Driver, PackageVersion, PlatformPackage, RegistryIndex};
pub use search::{installed_annotation, DriverQuery};

/// A named remote source of drivers. Its index is fetched at most once.
#[derive(Debug)]
pub struct Registry {
    pub name: String,
    pub base_url: String,
    drivers: OnceCell<Vec<Driver>>,
}

impl Registry {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            base_url: base_url.into(),
            drivers: OnceCell::new(),
        })
    }

    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.base_url.trim_end_matches('/'))
    }

    /// Drivers in this registry, sorted by path. Fetches on first use.
    pub async fn drivers(self: &Arc<Self>, fetcher: &AuthenticatedFetcher) -> DbcResult<&[Driver]> {
        let drivers = self
            .drivers
            .get_or_try_init(|| async {
                let url = self.index_url();
                tracing::info!("Fetching driver index from {}", url);
                let body = fetcher.get(&url, None).await?;
                let index: RegistryIndex = serde_yaml::from_slice(&body).map_err(|e| {
                    DbcError::Package(format!("Failed to parse driver index {}: {}", url, e))
                })?;

                let owner = Arc::downgrade(self);
                let mut drivers = index.drivers;
                for driver in &mut drivers {
                    driver.registry = owner.clone();
                }
                drivers.sort_by(|a, b| a.path.cmp(&b.path));
                Ok::<_, DbcError>(drivers)
            })
            .await?;
        Ok(drivers.as_slice())
    }

    /// Cached drivers, if the index has been fetched
    pub fn cached(&self) -> Option<&[Driver]> {
        self.drivers.get().map(Vec::as_slice)
    }
}

/// Drivers gathered from every reachable registry
#[derive(Debug)]
pub struct DriverSet {
    pub drivers: Vec<Driver>,
    /// `PartialRegistryFailure` when some registries failed
    pub warning: Option<DbcError>,
}

/// Resolver over several registries. Owns the registry caches for its lifetime.
pub struct DriverRegistry {
    registries: Vec<Arc<Registry>>,
    fetcher: AuthenticatedFetcher,
}

impl DriverRegistry {
    pub fn new(sources: &[RegistrySource], fetcher: AuthenticatedFetcher) -> Self {
        let registries = sources
            .iter()
            .map(|s| Registry::new(s.name.clone(), s.base_url.clone()))
            .collect();
        Self {
            registries,
            fetcher,
        }
    }

    /// Registries from settings, fetched with reqwest and keychain credentials
    pub fn from_settings(settings: &Settings) -> DbcResult<Self> {
        let client = Arc::new(ReqwestHttpClient::new()?);
        let fetcher = AuthenticatedFetcher::new(client, Arc::new(KeyringCredentials));
        Ok(Self::new(&settings.registries, fetcher))
    }

    pub fn fetcher(&self) -> &AuthenticatedFetcher {
        &self.fetcher
    }

    /// Fetch every registry index concurrently and merge the results.
    ///
    /// Earlier registries win when two list the same driver path. Fails only
    /// when no registry could be read.
    pub async fn drivers(&self) -> DbcResult<DriverSet> {
        let mut tasks = JoinSet::new();
        for (position, registry) in self.registries.iter().enumerate() {
            let registry = Arc::clone(registry);
            let fetcher = self.fetcher.clone();
            tasks.spawn(async move {
                let result = registry.drivers(&fetcher).await.map(|_| ());
                (position, result)
            });
        }

        let mut failures: BTreeMap<usize, DbcError> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Err(e))) => {
                    failures.insert(position, e);
                }
                Ok((_, Ok(()))) => {}
                Err(e) => {
                    return Err(DbcError::Package(format!("registry fetch task failed: {}", e)));
                }
            }
        }

        if !self.registries.is_empty() && failures.len() == self.registries.len() {
            if failures.len() == 1 {
                if let Some((_, only)) = failures.pop_first() {
                    return Err(only);
                }
            }
            let details = self.describe_failures(&failures);
            return Err(DbcError::Package(format!(
                "no registry could be reached:\n  {}",
                details.join("\n  ")
            )));
        }

        let mut merged: BTreeMap<String, Driver> = BTreeMap::new();
        for registry in &self.registries {
            for driver in registry.cached().unwrap_or_default() {
                merged
                    .entry(driver.path.clone())
                    .or_insert_with(|| driver.clone());
            }
        }

        let warning = if failures.is_empty() {
            None
        } else {
            let details = self.describe_failures(&failures);
            tracing::warn!("{} registries failed", details.len());
            Some(DbcError::PartialRegistryFailure(details))
        };

        Ok(DriverSet {
            drivers: merged.into_values().collect(),
            warning,
        })
    }

    /// Look up one driver by path across all registries
    pub async fn find(&self, path: &str) -> DbcResult<(Driver, Option<DbcError>)> {
        let set = self.drivers().await?;
        let driver = set
            .drivers
            .into_iter()
            .find(|d| d.path == path)
            .ok_or_else(|| DbcError::NotFound(path.to_string()))?;
        Ok((driver, set.warning))
    }

    fn describe_failures(&self, failures: &BTreeMap<usize, DbcError>) -> Vec<String> {
        failures
            .iter()
            .map(|(position, e)| format!("{}: {}", self.registries[*position].name, e))
            .collect()
    }
}
