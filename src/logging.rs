use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use env_logger::{Builder, Env, Target, WriteStyle};

/// Where log records go. The TUI owns the terminal, so it logs to a file.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Install the global logger. `RUST_LOG` overrides the default `info` filter.
/// Calling this twice keeps the first logger.
pub fn init(target: LogTarget) -> std::io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    match target {
        LogTarget::Stderr => {
            builder.target(Target::Stderr);
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder
                .target(Target::Pipe(Box::new(file)))
                .write_style(WriteStyle::Never)
                .format_timestamp_secs();
        }
    }

    let _ = builder.try_init();
    Ok(())
}
