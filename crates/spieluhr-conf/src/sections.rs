//! Configuration sections.

use serde::{Deserialize, Serialize};
use spieluhr::profile::DEFAULT_PROFILE;
use spieluhr::{SearchMode, Sheet};

use crate::ConfigError;

/// How notes are fitted onto the mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Mechanism profile identifier.
    /// Default: sankyo20
    #[serde(rename = "box", default = "ConversionConfig::default_box_type")]
    pub box_type: String,

    /// Repetition filter threshold in ticks.
    /// Default: 1
    #[serde(default = "ConversionConfig::default_filter")]
    pub filter: u64,

    /// Explicit shift in semitones. Searched for when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpose: Option<i32>,

    #[serde(default)]
    pub search: SearchMode,
}

impl ConversionConfig {
    fn default_box_type() -> String {
        DEFAULT_PROFILE.to_string()
    }

    fn default_filter() -> u64 {
        1
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            box_type: Self::default_box_type(),
            filter: Self::default_filter(),
            transpose: None,
            search: SearchMode::default(),
        }
    }
}

/// Paper the strip is printed on, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Preset name, see [`spieluhr::sheet::PRESETS`].
    /// Default: letter
    #[serde(default = "SheetConfig::default_paper")]
    pub paper: String,

    // Overrides of the preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_in: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_out: Option<f64>,
}

impl SheetConfig {
    fn default_paper() -> String {
        "letter".to_string()
    }

    /// Resolve the preset and apply any overrides.
    pub fn to_sheet(&self) -> Result<Sheet, ConfigError> {
        let preset = Sheet::preset(&self.paper).ok_or_else(|| ConfigError::Invalid {
            key: "sheet.paper".to_string(),
            message: format!(
                "unknown paper {:?}, expected one of {}",
                self.paper,
                spieluhr::sheet::PRESETS
                    .iter()
                    .map(|(name, _, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?;

        Ok(Sheet {
            width: self.width.unwrap_or(preset.width),
            height: self.height.unwrap_or(preset.height),
            border: self.border.unwrap_or(preset.border),
            lead_in: self.lead_in.unwrap_or(preset.lead_in),
            lead_out: self.lead_out.unwrap_or(preset.lead_out),
        })
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            paper: Self::default_paper(),
            width: None,
            height: None,
            border: None,
            lead_in: None,
            lead_out: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter directive (trace, debug, info, warn, error).
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}
