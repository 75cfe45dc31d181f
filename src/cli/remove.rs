use dbc::core::DbcResult;
use dbc::package::DriverList;
use std::path::PathBuf;

pub fn run(driver: String, path: PathBuf) -> DbcResult<()> {
    let list_path = DriverList::resolve_path(&path);
    let mut list = DriverList::load(&list_path)?;
    list.remove(&driver)?;
    list.save(&list_path)?;

    println!("✓ Removed {} from {}", driver, list_path.display());
    Ok(())
}
