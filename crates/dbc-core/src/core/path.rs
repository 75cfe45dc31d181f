use crate::core::error::{DbcError, DbcResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Get the dbc home directory (settings, stored state)
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\Columnar\dbc
/// - Linux: ~/.config/columnar/dbc
/// - macOS: ~/Library/Application Support/Columnar/dbc
pub fn dbc_home() -> DbcResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DbcError::Path("Could not determine config directory".to_string()))?;
    let vendor = if cfg!(any(windows, target_os = "macos")) {
        "Columnar"
    } else {
        "columnar"
    };
    Ok(config_dir.join(vendor).join("dbc"))
}

/// Get the settings file path, honoring `DBC_CONFIG`
pub fn settings_file() -> DbcResult<PathBuf> {
    if let Some(path) = std::env::var_os("DBC_CONFIG").filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(dbc_home()?.join("config.yaml"))
}

/// Get the per-user driver directory
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\ADBC\Drivers
/// - Linux: $XDG_CONFIG_HOME/adbc/drivers
/// - macOS: ~/Library/Application Support/ADBC/Drivers
pub fn user_drivers_dir() -> DbcResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| DbcError::Path("Could not determine config directory".to_string()))?;
    if cfg!(any(windows, target_os = "macos")) {
        Ok(config_dir.join("ADBC").join("Drivers"))
    } else {
        Ok(config_dir.join("adbc").join("drivers"))
    }
}

/// Get the system-wide driver directory
///
/// Platform-specific locations:
/// - Windows: %ProgramFiles%\ADBC\Drivers
/// - Linux: /etc/adbc/drivers
/// - macOS: /Library/Application Support/ADBC/Drivers
pub fn system_drivers_dir() -> PathBuf {
    if cfg!(windows) {
        let program_files = std::env::var_os("ProgramFiles")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
        program_files.join("ADBC").join("Drivers")
    } else if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Application Support/ADBC/Drivers")
    } else {
        PathBuf::from("/etc/adbc/drivers")
    }
}

/// Join directories with the platform path-list separator (`:` or `;`)
pub fn join_path_list(paths: &[PathBuf]) -> DbcResult<OsString> {
    std::env::join_paths(paths)
        .map_err(|e| DbcError::Path(format!("Cannot build search path: {}", e)))
}

/// Split a path list, dropping empty entries
pub fn split_path_list(list: &str) -> Vec<PathBuf> {
    std::env::split_paths(list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// Ensure a directory exists, creating it if necessary.
///
/// Returns true when the directory was created by this call.
pub fn ensure_dir(path: &Path) -> DbcResult<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

/// Remove a file, treating an already-missing file as success
pub fn remove_file_if_exists(path: &Path) -> DbcResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Remove a directory tree, treating an already-missing directory as success
pub fn remove_dir_if_exists(path: &Path) -> DbcResult<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
