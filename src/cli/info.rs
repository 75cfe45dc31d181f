use dbc::config::Settings;
use dbc::core::platform::current_platform;
use dbc::core::{DbcError, DbcResult};
use dbc::registry::Driver;
use serde::Serialize;

#[derive(Serialize)]
struct DriverInfoOutput<'a> {
    driver: &'a str,
    version: String,
    title: &'a str,
    license: &'a str,
    description: &'a str,
    packages: Vec<&'a str>,
    versions: Vec<String>,
}

pub async fn run(driver: String, json: bool) -> DbcResult<()> {
    let settings = Settings::load()?;
    let (found, warning) = super::registry(&settings)?.find(&driver).await?;
    if let Some(warning) = &warning {
        super::print_warning(warning);
    }

    let output = describe(&found)?;
    if json {
        let text = serde_json::to_string(&output)
            .map_err(|e| DbcError::Package(format!("Failed to encode driver info: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Driver: {}", output.driver);
    println!("Version: {}", output.version);
    println!("Title: {}", output.title);
    println!("License: {}", output.license);
    println!("Description: {}", output.description);
    println!("Available Packages:");
    for platform in &output.packages {
        println!("   - {}", platform);
    }
    if output.versions.is_empty() {
        println!("No versions available for {}", current_platform());
    } else {
        println!("Versions for {}: {}", current_platform(), output.versions.join(", "));
    }
    Ok(())
}

/// Newest version's metadata plus the versions usable on this platform
fn describe(driver: &Driver) -> DbcResult<DriverInfoOutput<'_>> {
    let latest = driver
        .versions
        .iter()
        .max_by(|a, b| a.version.cmp(&b.version))
        .ok_or_else(|| DbcError::Package(format!("driver '{}' has no published versions", driver.path)))?;

    Ok(DriverInfoOutput {
        driver: &driver.path,
        version: latest.version.to_string(),
        title: &driver.title,
        license: &driver.license,
        description: &driver.description,
        packages: latest.packages.iter().map(|p| p.platform.as_str()).collect(),
        versions: driver
            .versions_for(&current_platform())
            .iter()
            .map(|v| v.to_string())
            .collect(),
    })
}
