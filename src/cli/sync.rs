use crate::cli::progress::ProgressObserver;
use dbc::config::{InstallScope, Settings};
use dbc::core::DbcResult;
use dbc::package::{InstallStatus, SyncReconciler};
use std::path::PathBuf;

pub async fn run(path: PathBuf, level: Option<InstallScope>, no_verify: bool) -> DbcResult<()> {
    let settings = Settings::load()?;
    let scope = super::resolve_scope(level, &settings)?;
    let installer = super::installer(&settings, no_verify, false)?;

    let progress = ProgressObserver::new();
    let result = SyncReconciler::new(&installer)
        .sync(&path, &scope, &progress)
        .await;
    progress.finish();
    let report = result?;

    for warning in &report.warnings {
        super::print_warning(warning);
    }
    for driver in &report.drivers {
        match driver.status {
            InstallStatus::AlreadyInstalled => {
                println!("✓ {} {} already installed", driver.name, driver.version)
            }
            InstallStatus::Installed => println!("✓ {} {}", driver.name, driver.version),
        }
        if let Some(old) = &driver.replaced {
            println!("  ✓ Removed {} {}", old.id, old.version);
        }
        for message in &driver.post_install {
            println!("  {}", message);
        }
    }

    println!(
        "\n{} driver(s) synced, {} installed. Lock file: {}",
        report.drivers.len(),
        report.installed_count(),
        report.lock_path.display()
    );
    Ok(())
}
