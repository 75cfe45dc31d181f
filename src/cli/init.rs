use dbc::core::DbcResult;
use dbc::package::DriverList;
use std::path::PathBuf;

pub fn run(path: PathBuf) -> DbcResult<()> {
    let created = DriverList::init(&path)?;
    println!("✓ Created driver list {}", created.display());
    println!("  Use 'dbc add <driver>' to add drivers, then 'dbc sync' to install them");
    Ok(())
}
