use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use arbor::tui::RunOptions;

#[derive(Parser)]
#[command(name = "arbor", about = "A hierarchical task board for the terminal", version)]
struct Cli {
    /// Config file (default: ~/.config/arbor/config.toml)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Board data file
    #[arg(long = "data")]
    data: Option<PathBuf>,

    /// Open this project (slug or id) instead of the picker
    #[arg(long = "project")]
    project: Option<String>,

    /// Leave the mouse to the terminal so text can be selected
    #[arg(long = "mouse-select")]
    mouse_select: bool,

    /// Write logs here (filter with ARBOR_LOG)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arbor")
        .join("arbor.log")
}

/// Send tracing output to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_env("ARBOR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    if let Err(e) = init_logging(&log_path) {
        eprintln!("error: could not open log file {}: {}", log_path.display(), e);
        std::process::exit(1);
    }

    let options = RunOptions {
        config_path: cli.config,
        data_path: cli.data,
        project: cli.project,
        mouse_select: cli.mouse_select,
    };
    if let Err(e) = arbor::tui::run(options) {
        tracing::error!(error = %e, "fatal");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
