use dbc::core::DbcError;
use dbc::package::{InstallObserver, InstallState};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner while resolving, byte bar while downloading
pub struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Print a line above the bar
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line.as_ref());
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl InstallObserver for ProgressObserver {
    fn on_state(&self, driver: &str, state: InstallState) {
        let message = match state {
            InstallState::Searching => format!("Searching for {}", driver),
            InstallState::Downloading => format!("Downloading {}", driver),
            InstallState::Installing => format!("Installing {}", driver),
            InstallState::Verifying => format!("Verifying {}", driver),
            InstallState::Done => return,
        };
        if state != InstallState::Downloading {
            self.bar.set_style(spinner_style());
        }
        self.bar.set_message(message);
    }

    fn on_download_progress(&self, _driver: &str, downloaded: u64, total: Option<u64>) {
        if let Some(total) = total {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
                self.bar.set_style(download_style());
            }
        }
        self.bar.set_position(downloaded);
    }

    fn on_warning(&self, warning: &DbcError) {
        self.bar.println(format!("⚠️  Warning: {}", warning));
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg} {bar:40.cyan/blue} {bytes}/{total_bytes}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
