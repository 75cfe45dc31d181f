use dbc::config::Settings;
use dbc::core::platform::current_platform;
use dbc::core::version::parse_driver_constraint;
use dbc::core::DbcResult;
use dbc::package::driver_list::check_available;
use dbc::package::{DriverList, DriverSpec};
use std::path::PathBuf;

pub async fn run(driver: String, path: PathBuf, pre: bool) -> DbcResult<()> {
    let (name, constraint) = parse_driver_constraint(&driver)?;
    let list_path = DriverList::resolve_path(&path);
    let mut list = DriverList::load(&list_path)?;

    let spec = DriverSpec::new(constraint.as_ref(), pre);
    let settings = Settings::load()?;
    let registry = super::registry(&settings)?;
    if let Some(warning) = check_available(&registry, &name, &spec, &current_platform()).await? {
        super::print_warning(&warning);
    }

    let new_constraint = spec.describe().to_string();
    if let Some(old) = list.add(&name, spec) {
        println!(
            "Replacing existing driver {} (old constraint: {}; new constraint: {})",
            name,
            old.describe(),
            new_constraint
        );
    }
    list.save(&list_path)?;

    match &constraint {
        Some(c) => println!("✓ Added {} to driver list with constraint {}", name, c),
        None => println!("✓ Added {} to driver list", name),
    }
    println!("  Use 'dbc sync' to install the drivers in the list");
    Ok(())
}
