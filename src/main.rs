use clap::{Parser, Subcommand};
use dbc::config::InstallScope;
use dbc::package::driver_list::DEFAULT_LIST_PATH;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "dbc")]
#[command(about = "Install and manage ADBC drivers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a driver, e.g. `dbc install "sqlite>=1.0"`
    Install {
        /// Driver name with an optional version constraint
        driver: String,
        /// Level to install to (system, user, env)
        #[arg(short, long)]
        level: Option<InstallScope>,
        /// Install even when the package has no signature
        #[arg(long)]
        no_verify: bool,
        /// Allow prerelease versions
        #[arg(long)]
        pre: bool,
    },
    /// Uninstall a driver
    Uninstall {
        driver: String,
        /// Level to uninstall from (system, user, env)
        #[arg(short, long)]
        level: Option<InstallScope>,
    },
    /// Create a driver list
    Init {
        /// File to create (a directory gets dbc.toml)
        #[arg(default_value = DEFAULT_LIST_PATH)]
        path: PathBuf,
    },
    /// Add a driver to the driver list
    Add {
        /// Driver name with an optional version constraint
        driver: String,
        /// Driver list to edit
        #[arg(short, long, default_value = DEFAULT_LIST_PATH)]
        path: PathBuf,
        /// Allow prerelease versions for this driver
        #[arg(long)]
        pre: bool,
    },
    /// Remove a driver from the driver list
    Remove {
        driver: String,
        /// Driver list to edit
        #[arg(short, long, default_value = DEFAULT_LIST_PATH)]
        path: PathBuf,
    },
    /// Install every driver in the driver list and write the lock file
    Sync {
        /// Driver list to sync from
        #[arg(short, long, default_value = DEFAULT_LIST_PATH)]
        path: PathBuf,
        /// Level to install to (system, user, env)
        #[arg(short, long)]
        level: Option<InstallScope>,
        /// Install even when a package has no signature
        #[arg(long)]
        no_verify: bool,
    },
    /// Search available drivers
    Search {
        /// Regular expression matched against names and descriptions
        pattern: Option<String>,
        /// Only match driver names
        #[arg(short, long)]
        names_only: bool,
        /// Show versions and install locations
        #[arg(short, long)]
        verbose: bool,
    },
    /// List installed drivers
    List {
        /// Only this level (system, user, env)
        #[arg(short, long)]
        level: Option<InstallScope>,
    },
    /// Show details about a driver
    Info {
        driver: String,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Install {
            driver,
            level,
            no_verify,
            pre,
        } => cli::install::run(driver, level, no_verify, pre).await,
        Commands::Uninstall { driver, level } => cli::uninstall::run(driver, level),
        Commands::Init { path } => cli::init::run(path),
        Commands::Add { driver, path, pre } => cli::add::run(driver, path, pre).await,
        Commands::Remove { driver, path } => cli::remove::run(driver, path),
        Commands::Sync {
            path,
            level,
            no_verify,
        } => cli::sync::run(path, level, no_verify).await,
        Commands::Search {
            pattern,
            names_only,
            verbose,
        } => cli::search::run(pattern, names_only, verbose).await,
        Commands::List { level } => cli::list::run(level),
        Commands::Info { driver, json } => cli::info::run(driver, json).await,
    };

    // Display error with helpful suggestions
    if let Err(ref e) = result {
        eprintln!("\n{}", dbc::format_error_with_help(e));
        std::process::exit(1);
    }
}
