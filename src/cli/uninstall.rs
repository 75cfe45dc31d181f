use dbc::config::{InstallScope, Settings};
use dbc::core::{DbcError, DbcResult};
use dbc::package::installer;

pub fn run(driver: String, level: Option<InstallScope>) -> DbcResult<()> {
    let settings = Settings::load()?;
    let scope = super::resolve_scope(level, &settings)?;

    match installer::uninstall(&scope, &driver)? {
        Some(record) => {
            println!("✓ Uninstalled {} {} from {}", record.id, record.version, scope.location);
            Ok(())
        }
        None => Err(DbcError::NotFound(format!(
            "{} (not installed at the {} level)",
            driver, scope.level
        ))),
    }
}
