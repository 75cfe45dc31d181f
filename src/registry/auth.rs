//! Bearer-token authentication with a single refresh-and-retry.

use crate::core::{CredentialStore, DbcError, DbcResult};
use crate::registry::http::{DownloadProgress, HttpClient, HttpResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[async_trait]
pub trait Credential: Send + Sync {
    async fn auth_token(&self) -> DbcResult<String>;

    /// Obtain a fresh token after the current one was rejected
    async fn refresh(&self) -> DbcResult<()>;
}

pub trait CredentialProvider: Send + Sync {
    fn credentials_for_host(&self, url: &str) -> Option<Arc<dyn Credential>>;
}

/// Never supplies credentials
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credentials_for_host(&self, _url: &str) -> Option<Arc<dyn Credential>> {
        None
    }
}

/// Host part of a URL, lowercased
pub fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}

/// Tokens kept in the OS keychain, one entry per registry host
pub struct KeyringCredentials;

impl CredentialProvider for KeyringCredentials {
    fn credentials_for_host(&self, url: &str) -> Option<Arc<dyn Credential>> {
        let host = host_of(url)?;
        match CredentialStore::find(&host) {
            Ok(Some(token)) => Some(Arc::new(StoredToken {
                host,
                token: Mutex::new(token),
            })),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("No credentials for {}: {}", host, e);
                None
            }
        }
    }
}

struct StoredToken {
    host: String,
    token: Mutex<String>,
}

#[async_trait]
impl Credential for StoredToken {
    async fn auth_token(&self) -> DbcResult<String> {
        Ok(self.token.lock().await.clone())
    }

    async fn refresh(&self) -> DbcResult<()> {
        // Another process may have logged in again since we read the keychain.
        let latest = CredentialStore::find(&self.host)?.ok_or_else(|| {
            DbcError::Unauthorized(format!("no stored credentials for {}", self.host))
        })?;
        *self.token.lock().await = latest;
        Ok(())
    }
}

/// GETs through an [`HttpClient`], attaching credentials for the target host
#[derive(Clone)]
pub struct AuthenticatedFetcher {
    client: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
}

impl AuthenticatedFetcher {
    pub fn new(client: Arc<dyn HttpClient>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Anonymous fetcher, for tests and public registries
    pub fn anonymous(client: Arc<dyn HttpClient>) -> Self {
        Self::new(client, Arc::new(NoCredentials))
    }

    /// Fetch `url` and return the body of a 2xx response.
    ///
    /// A 401/403 with credentials triggers exactly one refresh and one retry.
    pub async fn get(&self, url: &str, progress: Option<&dyn DownloadProgress>) -> DbcResult<Vec<u8>> {
        let credential = self.credentials.credentials_for_host(url);

        let mut response = self.send(url, credential.as_deref(), progress).await?;
        if is_auth_failure(&response) {
            let Some(credential) = credential.as_deref() else {
                return Err(DbcError::Unauthorized(format!(
                    "{} returned HTTP {}",
                    url, response.status
                )));
            };

            tracing::debug!("Refreshing credentials after HTTP {} from {}", response.status, url);
            credential.refresh().await?;
            response = self.send(url, Some(credential), progress).await?;
            if is_auth_failure(&response) {
                return Err(DbcError::Unauthorized(format!(
                    "{} returned HTTP {} after refreshing credentials",
                    url, response.status
                )));
            }
        }

        if !response.is_success() {
            return Err(DbcError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        Ok(response.body)
    }

    async fn send(
        &self,
        url: &str,
        credential: Option<&dyn Credential>,
        progress: Option<&dyn DownloadProgress>,
    ) -> DbcResult<HttpResponse> {
        let mut headers = Vec::new();
        if let Some(credential) = credential {
            let token = credential.auth_token().await?;
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        self.client.get(url, &headers, progress).await
    }
}

fn is_auth_failure(response: &HttpResponse) -> bool {
    matches!(response.status, 401 | 403)
}
