pub mod add;
pub mod info;
pub mod init;
pub mod install;
pub mod list;
pub mod progress;
pub mod remove;
pub mod search;
pub mod sync;
pub mod uninstall;

use dbc::config::{InstallScope, LocationResolver, ScopeConfig, Settings};
use dbc::core::{DbcError, DbcResult};
use dbc::package::{InstallOptions, Installer};
use dbc::registry::DriverRegistry;
use std::sync::Arc;

/// Scope from `--level`, falling back to the configured default
pub fn resolve_scope(level: Option<InstallScope>, settings: &Settings) -> DbcResult<ScopeConfig> {
    let level = match level {
        Some(level) => level,
        None => settings.default_level()?,
    };
    let scope = LocationResolver::from_process()?.resolve_scope(level);
    for problem in &scope.problems {
        print_warning(problem);
    }
    Ok(scope)
}

pub fn registry(settings: &Settings) -> DbcResult<Arc<DriverRegistry>> {
    Ok(Arc::new(DriverRegistry::from_settings(settings)?))
}

pub fn installer(settings: &Settings, no_verify: bool, pre: bool) -> DbcResult<Installer> {
    let options = InstallOptions {
        verify_signatures: settings.verify_signatures && !no_verify,
        allow_prerelease: pre,
    };
    Installer::new(registry(settings)?, options)
}

pub fn print_warning(warning: &DbcError) {
    eprintln!("⚠️  Warning: {}", warning);
}
