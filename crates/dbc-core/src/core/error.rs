use thiserror::Error;

pub type DbcResult<T> = Result<T, DbcError>;

#[derive(Error, Debug)]
pub enum DbcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("driver '{0}' not found")]
    NotFound(String),

    #[error("no version of '{driver}' satisfies '{constraint}' for platform {platform}")]
    NoSatisfyingVersion {
        driver: String,
        constraint: String,
        platform: String,
    },

    /// Some, but not all, registries failed. Returned next to usable results.
    #[error("{} registr{} could not be reached:\n  {}", .0.len(), if .0.len() == 1 { "y" } else { "ies" }, .0.join("\n  "))]
    PartialRegistryFailure(Vec<String>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("no signature file found for {0}")]
    SignatureMissing(String),

    #[error("signature verification failed for {0}")]
    SignatureInvalid(String),

    #[error("checksum mismatch for {driver}: lock file has {expected}, installed artifact is {actual}")]
    ChecksumMismatch {
        driver: String,
        expected: String,
        actual: String,
    },

    #[error("manifest {path} uses manifest_version {found}, newest supported is {supported}")]
    ManifestVersionUnsupported {
        path: String,
        found: u32,
        supported: u32,
    },

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_message() {
        let err = DbcError::PartialRegistryFailure(vec!["private: HTTP 503".to_string()]);
        let msg = err.to_string();
        assert!(msg.starts_with("1 registry could not be reached"));
        assert!(msg.contains("private: HTTP 503"));
    }
}
