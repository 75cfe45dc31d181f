use crate::core::{DbcError, DbcResult};
use keyring::Entry;

/// Service name for keyring entries
const KEYRING_SERVICE: &str = "dbc";

/// Reads registry tokens from the OS keychain
///
/// Platform support:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// Entries are keyed by registry host, e.g. `dbc-cdn-private.columnar.tech`.
pub struct CredentialStore;

impl CredentialStore {
    /// Token stored for `key`, or `None` when the keychain has no entry
    pub fn find(key: &str) -> DbcResult<Option<String>> {
        let entry = Entry::new(KEYRING_SERVICE, key)
            .map_err(|e| DbcError::Config(format!("Failed to create keyring entry: {}", e)))?;

        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(DbcError::Config(format!(
                "Failed to retrieve credential from keychain: {}",
                e
            ))),
        }
    }
}
