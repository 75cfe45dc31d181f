pub mod checksum;
pub mod downloader;
pub mod driver_list;
pub mod extractor;
pub mod installer;
pub mod lockfile;
pub mod machine;
pub mod selection;
pub mod signature;
pub mod sync;
// installed-driver records live in dbc-core, re-export for convenience
pub mod manifest {
    pub use dbc_core::package::manifest::*;
}

pub use downloader::PackageDownloader;
pub use driver_list::{DriverList, DriverSpec};
pub use extractor::PackageExtractor;
pub use installer::{InstallObserver, InstallOptions, InstallTarget, Installer, NoopObserver};
pub use lockfile::{LockEntry, Lockfile};
pub use machine::{InstallMachine, InstallOutcome, InstallState, InstallStatus};
pub use manifest::InstalledDriver;
pub use selection::PackageSelection;
pub use signature::SignatureVerifier;
pub use sync::{SyncReconciler, SyncReport};
