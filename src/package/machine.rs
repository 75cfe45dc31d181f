//! Single-driver install state machine.
//!
//! `Searching -> Downloading -> Installing -> Verifying -> Done`. The machine
//! only decides what happens next; [`crate::package::installer`] performs each
//! unit of work and feeds the result back as an event. The record is written
//! while still `Verifying`, so `Done` means the manifest is on disk.

use crate::core::{DbcError, DbcResult};
use crate::package::downloader::DownloadedPackage;
use crate::package::extractor::ExtractedPackage;
use crate::package::selection::PackageSelection;
use dbc_core::InstalledDriver;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    Searching,
    Downloading,
    Installing,
    Verifying,
    Done,
}

impl fmt::Display for InstallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallState::Searching => "searching",
            InstallState::Downloading => "downloading",
            InstallState::Installing => "installing",
            InstallState::Verifying => "verifying",
            InstallState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Completion of a unit of work
#[derive(Debug)]
pub enum InstallEvent {
    Resolved {
        selection: PackageSelection,
        existing: Option<InstalledDriver>,
    },
    Downloaded(DownloadedPackage),
    Installed(ExtractedPackage),
    Verified(ExtractedPackage),
    Persisted {
        record: InstalledDriver,
        checksum: String,
    },
}

/// Next unit of work for the runner
#[derive(Debug)]
pub enum InstallWork {
    Download(PackageSelection),
    /// Remove `replace` (if any), then extract into `target_dir`
    Install {
        archive: DownloadedPackage,
        target_dir: PathBuf,
        replace: Option<InstalledDriver>,
    },
    /// On failure the runner removes the extracted directory
    Verify {
        extracted: ExtractedPackage,
        require_signature: bool,
    },
    Persist { record: InstalledDriver },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    AlreadyInstalled,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub status: InstallStatus,
    pub record: InstalledDriver,
    /// Different version that was removed to make room
    pub replaced: Option<InstalledDriver>,
    /// Checksum of the freshly installed library; `None` when nothing was installed
    pub checksum: Option<String>,
    pub post_install: Vec<String>,
}

pub struct InstallMachine {
    state: InstallState,
    install_root: PathBuf,
    verify_signatures: bool,
    selection: Option<PackageSelection>,
    existing: Option<InstalledDriver>,
    post_install: Vec<String>,
    /// Signature checked; the manifest is still being written
    verified: bool,
    outcome: Option<InstallOutcome>,
}

impl InstallMachine {
    /// Machine installing into `install_root` (the scope's first directory)
    pub fn new(install_root: PathBuf, verify_signatures: bool) -> Self {
        Self {
            state: InstallState::Searching,
            install_root,
            verify_signatures,
            selection: None,
            existing: None,
            post_install: Vec::new(),
            verified: false,
            outcome: None,
        }
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Advance on `event`. `Ok(None)` means the machine reached `Done`.
    pub fn step(&mut self, event: InstallEvent) -> DbcResult<Option<InstallWork>> {
        match (self.state, event) {
            (InstallState::Searching, InstallEvent::Resolved { selection, existing }) => {
                let existing = match existing {
                    Some(current) if current.version == selection.version => {
                        tracing::info!(
                            "{} {} is already installed",
                            selection.driver.path,
                            selection.version
                        );
                        self.state = InstallState::Done;
                        self.outcome = Some(InstallOutcome {
                            status: InstallStatus::AlreadyInstalled,
                            record: current,
                            replaced: None,
                            checksum: None,
                            post_install: Vec::new(),
                        });
                        self.selection = Some(selection);
                        return Ok(None);
                    }
                    other => other,
                };

                // A different installed version gets replaced during Installing
                self.existing = existing;
                self.state = InstallState::Downloading;
                let work = InstallWork::Download(selection.clone());
                self.selection = Some(selection);
                Ok(Some(work))
            }
            (InstallState::Downloading, InstallEvent::Downloaded(archive)) => {
                let selection = self.current_selection()?;
                let target_dir = self.install_root.join(selection.install_dir_name());
                self.state = InstallState::Installing;
                Ok(Some(InstallWork::Install {
                    archive,
                    target_dir,
                    replace: self.existing.clone(),
                }))
            }
            (InstallState::Installing, InstallEvent::Installed(extracted)) => {
                self.state = InstallState::Verifying;
                Ok(Some(InstallWork::Verify {
                    extracted,
                    require_signature: self.verify_signatures,
                }))
            }
            (InstallState::Verifying, InstallEvent::Verified(extracted)) if !self.verified => {
                let selection = self.current_selection()?;
                let record = extracted.to_record(&selection.driver.path, &selection.platform);
                self.post_install = extracted.manifest.post_install.messages.clone();
                self.verified = true;
                Ok(Some(InstallWork::Persist { record }))
            }
            (InstallState::Verifying, InstallEvent::Persisted { record, checksum })
                if self.verified =>
            {
                self.state = InstallState::Done;
                self.outcome = Some(InstallOutcome {
                    status: InstallStatus::Installed,
                    record,
                    replaced: self.existing.take(),
                    checksum: Some(checksum),
                    post_install: std::mem::take(&mut self.post_install),
                });
                Ok(None)
            }
            (state, event) => Err(DbcError::Package(format!(
                "install of {} received {} while {}",
                self.selection
                    .as_ref()
                    .map(|s| s.driver.path.as_str())
                    .unwrap_or("driver"),
                event_name(&event),
                state
            ))),
        }
    }

    /// Final result once `step` has returned `Ok(None)`
    pub fn into_outcome(self) -> DbcResult<InstallOutcome> {
        self.outcome.ok_or_else(|| {
            DbcError::Package(format!("install stopped while {}", self.state))
        })
    }

    fn current_selection(&self) -> DbcResult<&PackageSelection> {
        self.selection
            .as_ref()
            .ok_or_else(|| DbcError::Package("install has no resolved package".to_string()))
    }
}

fn event_name(event: &InstallEvent) -> &'static str {
    match event {
        InstallEvent::Resolved { .. } => "a resolved package",
        InstallEvent::Downloaded(_) => "a download",
        InstallEvent::Installed(_) => "an extracted package",
        InstallEvent::Verified(_) => "a verified package",
        InstallEvent::Persisted { .. } => "a persisted manifest",
    }
}
