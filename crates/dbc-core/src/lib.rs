// Core functionality
pub mod core;

// Installed driver manifest
pub mod package;

// Re-export commonly used types
pub use core::{format_error_with_help, CredentialStore, DbcError, DbcResult, ErrorHelp};
pub use package::manifest::InstalledDriver;
