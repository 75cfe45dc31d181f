use dbc::config::{InstallScope, LocationResolver, ScopeConfig};
use dbc::core::platform::current_platform;
use dbc::core::DbcResult;

/// Installed drivers at one level, or at every level
pub fn run(level: Option<InstallScope>) -> DbcResult<()> {
    let resolver = LocationResolver::from_process()?;
    let levels: Vec<InstallScope> = match level {
        Some(level) => vec![level],
        None => InstallScope::ALL.to_vec(),
    };

    println!("Current System: {}\n", current_platform());
    for level in levels {
        print_scope(&resolver.resolve_scope(level));
    }
    Ok(())
}

fn print_scope(scope: &ScopeConfig) {
    let location = if scope.location.is_empty() {
        "(not configured)"
    } else {
        scope.location.as_str()
    };
    println!("{} ({})", scope.level, location);

    if let Some(error) = &scope.error {
        println!("  ✗ {}", error);
        return;
    }
    if scope.drivers.is_empty() {
        println!("  No drivers installed.");
    }
    for (id, record) in &scope.drivers {
        println!("  {} {} - {}", id, record.version, record.name);
    }
    for problem in &scope.problems {
        println!("  ⚠️  {}", problem);
    }
    println!();
}
