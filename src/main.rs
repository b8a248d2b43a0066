use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicatif::ProgressBar;
use tokio::io::AsyncReadExt;

use vmscan::cli::{Cli, Command, OutputFormat};
use vmscan::config::{self, Config};
use vmscan::error::ScanError;
use vmscan::logging::{self, Verbosity};
use vmscan::{inventory, invoke, listing, ownership, render};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| config.log_file.as_ref().map(PathBuf::from));
    logging::init(
        Verbosity::from_flags(cli.verbose, cli.quiet),
        log_file.as_deref(),
    )?;

    // Spinner only when a human is watching stderr and stdout is plain text.
    let show_spinner = std::io::stderr().is_terminal()
        && !cli.quiet
        && !cli.verbose
        && cli.output == OutputFormat::Plain;

    match cli.command {
        Command::List {
            all,
            prefix,
            details,
            strict,
            timeout_ms,
            program,
        } => {
            if let Some(prefix) = prefix {
                config.prefix = prefix;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.tool.timeout_ms = timeout_ms;
            }
            if let Some(program) = program {
                config.tool.program = program;
            }
            config::validate_config(&config)?;

            let request = config.listing_request()?;
            let spinner = show_spinner.then(|| spinner(&config));
            let result = inventory::list(&request, &config.headings()).await;
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            let listing = result?;
            if strict {
                listing.require_success(&request)?;
            }

            let prefix = if all { "" } else { config.prefix.as_str() };
            if details {
                let vms = ownership::filter_owned_details(listing.details(), prefix);
                print!("{}", render::details(&vms, cli.output));
            } else {
                print!("{}", render::names(&listing.owned(prefix), cli.output));
            }
        }
        Command::Parse {
            file,
            prefix,
            details,
        } => {
            let text = read_listing(file.as_deref()).await?;
            let headings = config.headings();
            let prefix = prefix.unwrap_or_default();
            if details {
                let vms =
                    ownership::filter_owned_details(listing::parse_detailed(&text, &headings), &prefix);
                print!("{}", render::details(&vms, cli.output));
            } else {
                let records = listing::parse_with(&text, &headings);
                let names = ownership::filter_owned(&records, &prefix);
                print!("{}", render::names(&names, cli.output));
            }
        }
        Command::Check { program } => {
            if let Some(program) = program {
                config.tool.program = program;
            }
            config::validate_config(&config)?;
            let request = config.check_request()?;
            invoke::check_available(&request).await?;
            print!("{}", render::available(&config.tool.program, cli.output));
        }
    }

    Ok(())
}

fn spinner(config: &Config) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Listing VMs via {}...", config.tool.program));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Captured listing from `file` or stdin, decoded the same lossy way as
/// live tool output.
async fn read_listing(file: Option<&std::path::Path>) -> Result<String, ScanError> {
    let bytes = match file {
        Some(path) => tokio::fs::read(path).await.map_err(|e| ScanError::Io {
            context: format!("reading listing from {}", path.display()),
            source: e,
        })?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .map_err(|e| ScanError::Io {
                    context: "reading listing from stdin".into(),
                    source: e,
                })?;
            buf
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
