use dbc::config::{InstallScope, LocationResolver, ScopeConfig, Settings};
use dbc::core::platform::current_platform;
use dbc::core::DbcResult;
use dbc::registry::{installed_annotation, DriverQuery};

pub async fn run(pattern: Option<String>, names_only: bool, verbose: bool) -> DbcResult<()> {
    let settings = Settings::load()?;
    let query = DriverQuery::new(pattern.as_deref(), names_only)?;

    let set = super::registry(&settings)?.drivers().await?;
    if let Some(warning) = &set.warning {
        super::print_warning(warning);
    }

    let results = query.filter(&set.drivers);

    if results.is_empty() {
        println!("No drivers found.");
        return Ok(());
    }

    let resolver = LocationResolver::from_process()?;
    let scopes: Vec<ScopeConfig> = InstallScope::ALL
        .iter()
        .map(|s| resolver.resolve_scope(*s))
        .collect();
    let platform = current_platform();

    for driver in results {
        let suffix = installed_annotation(&scopes, &driver.path);
        println!("  {} - {}{}", driver.path, driver.description, suffix);

        if verbose {
            println!("    Title: {}", driver.title);
            println!("    License: {}", driver.license);
            let versions: Vec<String> = driver
                .versions_for(&platform)
                .iter()
                .map(|v| v.to_string())
                .collect();
            println!("    Available versions ({}): {}", platform, versions.join(", "));
            for scope in &scopes {
                if let Some(record) = scope.installed(&driver.path) {
                    println!("    Installed {} at {} ({})", record.version, scope.level, scope.location);
                }
            }
        }
    }

    Ok(())
}
