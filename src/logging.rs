//! Tracing setup shared by the binaries.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber: stderr always, plus a timestamped log file
/// under `directory` when one is configured. `RUST_LOG` overrides the level.
pub fn init(name: &str, verbose: bool, directory: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    let file_layer = directory.and_then(|dir| open_log_file(dir, name)).map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}

/// Run `f` with a temporary stderr subscriber, so messages emitted before the
/// real subscriber exists (config loading, mostly) are not lost.
pub fn bootstrap<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new("warn"))
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

pub fn log_file_path(directory: &Path, name: &str) -> PathBuf {
    let now = chrono::Local::now().timestamp();
    directory.join(format!("{now}-{name}.log"))
}

fn open_log_file(directory: &Path, name: &str) -> Option<fs::File> {
    if let Err(e) = fs::create_dir_all(directory) {
        eprintln!("Failed to create log dir {}: {e}", directory.display());
        return None;
    }
    let path = log_file_path(directory, name);
    match fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", path.display());
            None
        }
    }
}
