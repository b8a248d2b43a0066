use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vmscan", about = "Inventory of krunvm virtual machines")]
pub struct Cli {
    /// Path to config file (default: ./vmscan.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress logging and progress on stderr
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    pub output: OutputFormat,

    /// Append debug logs to this file (overrides config)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List VMs owned by this system
    List {
        /// List every VM, regardless of prefix
        #[arg(long)]
        all: bool,

        /// Ownership prefix (overrides config)
        #[arg(long)]
        prefix: Option<String>,

        /// Include CPU, memory and image details
        #[arg(long)]
        details: bool,

        /// Fail if the tool exits with a non-zero status
        #[arg(long)]
        strict: bool,

        /// Timeout for the listing call in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Path of the VM manager executable (overrides config)
        #[arg(long)]
        program: Option<String>,
    },

    /// Parse a captured listing from FILE, or stdin, without running the tool
    Parse {
        file: Option<PathBuf>,

        /// Only names starting with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Include CPU, memory and image details
        #[arg(long)]
        details: bool,
    },

    /// Check that the VM manager can be launched
    Check {
        /// Path of the VM manager executable (overrides config)
        #[arg(long)]
        program: Option<String>,
    },
}
