//! Stage log setup: stderr plus an optional file.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `level`; `--verbose`
/// lowers the default to `debug`. Nothing goes to stderr when `quiet`.
pub fn init(level: &str, verbose: bool, quiet: bool, file: Option<&Path>) -> Result<(), String> {
    let default = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr = (!quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file = match file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .map_err(|e| format!("could not create '{}': {}", dir.display(), e))?;
            }
            let handle = File::create(path)
                .map_err(|e| format!("could not open log file '{}': {}", path.display(), e))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(handle)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()
        .map_err(|e| format!("could not install logger: {}", e))
}
