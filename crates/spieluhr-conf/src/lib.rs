//! Layered configuration loading for spieluhr.
//!
//! Holds the defaults the CLI falls back to when a flag is not given: which
//! music box to target, how notes are filtered and transposed, and the
//! paper the strip is printed on.
//!
//! # Usage
//!
//! ```rust,no_run
//! use spieluhr_conf::SpieluhrConfig;
//!
//! let (config, _sources) = SpieluhrConfig::load_with_sources_from(None).expect("Failed to load config");
//! let sheet = config.sheet.to_sheet().expect("Bad sheet");
//! println!("box {} on {} mm paper", config.conversion.box_type, sheet.width);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, key by key):
//! 1. `/etc/spieluhr/config.toml` (system)
//! 2. `~/.config/spieluhr/config.toml` (user)
//! 3. `./spieluhr.toml` (local override, replaced by `--config`)
//! 4. Environment variables (`SPIELUHR_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [conversion]
//! box = "sankyo20"
//! filter = 1
//! search = "any"
//!
//! [sheet]
//! paper = "a4x2"
//! border = 6.0
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ConversionConfig, SheetConfig, TelemetryConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete spieluhr configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpieluhrConfig {
    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub sheet: SheetConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl SpieluhrConfig {
    /// Load configuration from all sources and report where it came from.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/spieluhr/config.toml`
    /// 3. `~/.config/spieluhr/config.toml`
    /// 4. `./spieluhr.toml`, or `config_path` when given (missing is an error)
    /// 5. Environment variables
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = SpieluhrConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_from_file(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        // Build TOML manually for nicer formatting
        let mut output = String::new();

        output.push_str("# spieluhr configuration\n\n");

        output.push_str("[conversion]\n");
        output.push_str(&format!("box = \"{}\"\n", self.conversion.box_type));
        output.push_str(&format!("filter = {}\n", self.conversion.filter));
        match self.conversion.transpose {
            Some(shift) => output.push_str(&format!("transpose = {shift}\n")),
            None => output.push_str("# transpose = 0\n"),
        }
        output.push_str(&format!("search = \"{}\"\n", self.conversion.search));

        output.push_str("\n[sheet]\n");
        output.push_str(&format!("paper = \"{}\"\n", self.sheet.paper));
        for (key, value) in [
            ("width", self.sheet.width),
            ("height", self.sheet.height),
            ("border", self.sheet.border),
            ("lead_in", self.sheet.lead_in),
            ("lead_out", self.sheet.lead_out),
        ] {
            if let Some(mm) = value {
                output.push_str(&format!("{key} = {mm:?}\n"));
            }
        }

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!(
            "log_level = \"{}\"\n",
            self.telemetry.log_level
        ));

        output
    }
}
