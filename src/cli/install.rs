use crate::cli::progress::ProgressObserver;
use dbc::config::{InstallScope, Settings};
use dbc::core::version::parse_driver_constraint;
use dbc::core::DbcResult;
use dbc::package::{InstallStatus, InstallTarget};

pub async fn run(
    driver: String,
    level: Option<InstallScope>,
    no_verify: bool,
    pre: bool,
) -> DbcResult<()> {
    let settings = Settings::load()?;
    let (name, constraint) = parse_driver_constraint(&driver)?;
    let scope = super::resolve_scope(level, &settings)?;
    let installer = super::installer(&settings, no_verify, pre)?;

    let progress = ProgressObserver::new();
    let result = installer
        .install(&scope, InstallTarget::Resolve { name, constraint }, &progress)
        .await;
    progress.finish();
    let outcome = result?;

    let record = &outcome.record;
    match outcome.status {
        InstallStatus::AlreadyInstalled => {
            println!("✓ {} {} already installed ({})", record.id, record.version, scope.location);
        }
        InstallStatus::Installed => {
            println!("✓ Installed {} {} to {}", record.id, record.version, scope.location);
            if let Some(old) = &outcome.replaced {
                println!("  ✓ Removed {} {}", old.id, old.version);
            }
        }
    }
    for message in &outcome.post_install {
        println!("  {}", message);
    }

    Ok(())
}
