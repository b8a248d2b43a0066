use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::ScanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// No tracing output on the terminal.
    Quiet,
    /// Warnings, or whatever `RUST_LOG` asks for.
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn terminal_filter(self) -> EnvFilter {
        match self {
            Self::Verbose => EnvFilter::new("debug"),
            Self::Quiet => EnvFilter::new("off"),
            Self::Normal => EnvFilter::from_default_env()
                .add_directive("vmscan=warn".parse().expect("valid log directive")),
        }
    }
}

/// Install the global subscriber: stderr always, plus `log_file` (appended,
/// no ANSI, `vmscan=debug`) when given. Stdout is left to the listing.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> Result<(), ScanError> {
    let terminal_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(verbosity.terminal_filter());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| ScanError::Io {
                    context: format!("creating log directory {}", parent.display()),
                    source: e,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ScanError::Io {
                    context: format!("opening log file {}", path.display()),
                    source: e,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("vmscan=debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_wins_over_quiet() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }
}
