//! dbc: install and manage ADBC drivers
//!
//! This crate provides the main dbc library, re-exporting core functionality
//! from `dbc-core` and organizing the registry client, install engine and
//! driver-list sync on top of it.

pub use dbc_core::{format_error_with_help, CredentialStore, DbcError, DbcResult, ErrorHelp, InstalledDriver};

/// Core module re-exported from dbc-core.
pub mod core {
    pub use dbc_core::core::*;
}

/// Install scopes, locations and user settings.
pub mod config;

/// Installed-record persistence (manifest files, Windows registry).
pub mod store;

/// Remote driver registries.
pub mod registry;

/// Package selection, install, and sync.
pub mod package;
