use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use facet::Facet;

use crate::error::ScanError;
use crate::invoke::InvocationRequest;
use crate::listing::HeadingTable;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "vmscan.toml";

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct Config {
    /// Ownership prefix of VMs created by this system.
    #[facet(default = "vortex-")]
    pub prefix: String,
    /// Append debug logs to this file.
    pub log_file: Option<String>,
    #[facet(default)]
    pub tool: ToolConfig,
    #[facet(default)]
    pub listing: ListingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: crate::ownership::DEFAULT_PREFIX.into(),
            log_file: None,
            tool: ToolConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct ToolConfig {
    #[facet(default = "krunvm")]
    pub program: String,
    /// Arguments of the listing call; `["list"]` when absent.
    pub args: Option<Vec<String>>,
    #[facet(default = 5000)]
    pub timeout_ms: u64,
    /// Extra variables for the tool's environment, on top of the inherited one.
    #[facet(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "krunvm".into(),
            args: None,
            timeout_ms: 5000,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct ListingConfig {
    /// Column-zero labels to skip in addition to the built-in ones.
    #[facet(default)]
    pub extra_headings: Vec<String>,
}

/// Environment the tool needs to start at all on this platform.
///
/// Homebrew's libkrun lives outside the default dyld search path on macOS.
pub fn platform_env() -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if cfg!(target_os = "macos") {
        env.insert("DYLD_LIBRARY_PATH".into(), "/opt/homebrew/lib".into());
    }
    env
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.tool.timeout_ms)
    }

    pub fn list_args(&self) -> Vec<String> {
        match &self.tool.args {
            Some(args) => args.clone(),
            None => vec!["list".into()],
        }
    }

    /// Platform defaults first, then configured overrides.
    pub fn tool_env(&self) -> BTreeMap<String, String> {
        let mut env = platform_env();
        env.extend(
            self.tool
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        env
    }

    pub fn headings(&self) -> HeadingTable {
        HeadingTable::with_extra(self.listing.extra_headings.iter().cloned())
    }

    /// Request for the listing call.
    pub fn listing_request(&self) -> Result<InvocationRequest, ScanError> {
        InvocationRequest::new(&self.tool.program)?
            .args(self.list_args())
            .envs(&self.tool_env())
            .timeout(self.timeout())
    }

    /// Request for the availability check (`<program> --help`).
    pub fn check_request(&self) -> Result<InvocationRequest, ScanError> {
        Ok(self.listing_request()?.with_args(["--help"]))
    }
}

// ── validation ────────────────────────────────────────────

pub fn validate_config(config: &Config) -> Result<(), ScanError> {
    if config.tool.program.trim().is_empty() {
        return Err(ScanError::Validation {
            message: "tool.program must not be empty".into(),
        });
    }
    if config.tool.timeout_ms < 1 {
        return Err(ScanError::Validation {
            message: "tool.timeout_ms must be at least 1".into(),
        });
    }
    for key in config.tool.env.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(ScanError::Validation {
                message: format!("invalid environment variable name '{key}'"),
            });
        }
    }
    for heading in &config.listing.extra_headings {
        if heading.trim().is_empty() {
            return Err(ScanError::Validation {
                message: "listing.extra_headings entries must not be empty".into(),
            });
        }
    }
    Ok(())
}

// ── public API ────────────────────────────────────────────

pub fn parse_config(contents: &str, path: &Path) -> Result<Config, ScanError> {
    let config: Config = facet_toml::from_str(contents).map_err(|e| ScanError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Load `path`, or `vmscan.toml` from the working directory when `path` is
/// `None`. Only an explicitly named file is required to exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, ScanError> {
    let (path, explicit) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no {DEFAULT_CONFIG_FILE} found, using defaults");
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ScanError::ConfigLoad {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let config = parse_config(&contents, path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
