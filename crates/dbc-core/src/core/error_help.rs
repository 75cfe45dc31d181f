use crate::core::DbcError;

/// Provides helpful suggestions for common errors
pub trait ErrorHelp {
    fn help(&self) -> Option<String>;
}

impl ErrorHelp for DbcError {
    fn help(&self) -> Option<String> {
        match self {
            DbcError::NotFound(_) => Some(
                "💡 Suggestion: Check the driver name spelling, or run 'dbc search' to see available drivers"
                    .to_string(),
            ),
            DbcError::NoSatisfyingVersion { driver, .. } => Some(format!(
                "💡 Suggestion: Relax the version constraint, or run 'dbc info {}' to see versions for this platform",
                driver
            )),
            DbcError::ChecksumMismatch { .. } => Some(
                "💡 Suggestion: The installed driver no longer matches the lock file. Uninstall it and run 'dbc sync' again, or delete the lock entry if the change is intended"
                    .to_string(),
            ),
            DbcError::SignatureMissing(_) => Some(
                "💡 Suggestion: The package ships no signature. Re-run with --no-verify only if you trust the source"
                    .to_string(),
            ),
            DbcError::SignatureInvalid(_) => Some(
                "💡 Suggestion: The package may have been tampered with. Do not install it; report the problem to the driver publisher"
                    .to_string(),
            ),
            DbcError::Unauthorized(_) => Some(
                "💡 Suggestion: Your stored credentials were rejected. Log in again to refresh them"
                    .to_string(),
            ),
            DbcError::ManifestVersionUnsupported { .. } => Some(
                "💡 Suggestion: This manifest was written by a newer dbc. Upgrade dbc to manage this driver"
                    .to_string(),
            ),
            DbcError::PartialRegistryFailure(_) => Some(
                "💡 Suggestion: Results from reachable registries are still shown. Check your network or registry settings"
                    .to_string(),
            ),
            DbcError::Version(msg) => {
                if msg.contains("Invalid version constraint") {
                    Some(
                        "💡 Suggestion: Use SemVer constraints (e.g., '1.2.3', '>=1.2.0', '>=1.0.0, <2.0.0', '^1.2')"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            DbcError::Path(msg) => {
                if msg.contains("Could not determine") {
                    Some(
                        "💡 Suggestion: Check your system environment variables (HOME, APPDATA, etc.)"
                            .to_string(),
                    )
                } else if msg.contains("no install location") {
                    Some(
                        "💡 Suggestion: Set ADBC_DRIVER_PATH, or activate a virtual environment or conda environment"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            DbcError::Package(msg) => {
                if msg.contains("driver list not found") {
                    Some(
                        "💡 Suggestion: Run 'dbc init' to create a driver list, or pass --path"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            DbcError::Yaml(e) => Some(format!(
                "💡 Suggestion: Check your YAML syntax. Common issues:\n  - Missing colons after keys\n  - Incorrect indentation\n  - Unclosed quotes\n\nError details: {}",
                e
            )),
            DbcError::TomlDe(_) => Some(
                "💡 Suggestion: Check the TOML syntax of the driver list, lock file or manifest"
                    .to_string(),
            ),
            DbcError::Http(e) => {
                if e.is_timeout() {
                    Some(
                        "💡 Suggestion: Check your internet connection, or try again later"
                            .to_string(),
                    )
                } else if e.is_connect() {
                    Some(
                        "💡 Suggestion: Check your internet connection and firewall settings"
                            .to_string(),
                    )
                } else {
                    Some(
                        "💡 Suggestion: Check your internet connection, or verify the registry URL (DBC_BASE_URL)"
                            .to_string(),
                    )
                }
            }
            DbcError::Io(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    Some(
                        "💡 Suggestion: Installing at the system level may need elevated permissions. Try --level user"
                            .to_string(),
                    )
                } else if e.kind() == std::io::ErrorKind::NotFound {
                    Some(
                        "💡 Suggestion: The file or directory may not exist. Check the path and try again"
                            .to_string(),
                    )
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Format an error with helpful suggestions
pub fn format_error_with_help(error: &DbcError) -> String {
    let mut output = format!("❌ Error: {}", error);

    if let Some(help) = error.help() {
        output.push_str("\n\n");
        output.push_str(&help);
    }

    output
}
