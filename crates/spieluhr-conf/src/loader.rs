//! Config file discovery, loading, and environment variable overlay.

use std::env;
use std::path::{Path, PathBuf};

use spieluhr::SearchMode;

use crate::{ConfigError, SpieluhrConfig};

/// Information about where config values came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in load order (system, user, local).
///
/// Only returns files that exist, except for `cli_path`:
/// if provided it replaces the local override and is returned even when
/// missing, so loading reports the bad path.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/spieluhr/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("spieluhr/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        files.push(path.to_path_buf());
        return files;
    }

    let local = PathBuf::from("spieluhr.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and apply the keys it sets on top of `config`.
pub fn load_from_file(config: &mut SpieluhrConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Apply the keys set in a TOML document, leaving everything else alone.
pub fn apply_toml(config: &mut SpieluhrConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let invalid = |key: &str, expected: &str| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("{key} must be {expected}"),
    };

    if let Some(conversion) = table.get("conversion").and_then(|v| v.as_table()) {
        if let Some(v) = conversion.get("box") {
            let name = v.as_str().ok_or_else(|| invalid("conversion.box", "a string"))?;
            config.conversion.box_type = name.to_string();
        }
        if let Some(v) = conversion.get("filter") {
            let ticks = v
                .as_integer()
                .and_then(|i| u64::try_from(i).ok())
                .ok_or_else(|| invalid("conversion.filter", "a non-negative integer"))?;
            config.conversion.filter = ticks;
        }
        if let Some(v) = conversion.get("transpose") {
            let shift = v
                .as_integer()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| invalid("conversion.transpose", "an integer"))?;
            config.conversion.transpose = Some(shift);
        }
        if let Some(v) = conversion.get("search") {
            let mode = v.as_str().ok_or_else(|| invalid("conversion.search", "a string"))?;
            config.conversion.search = parse_search(mode)?;
        }
    }

    if let Some(sheet) = table.get("sheet").and_then(|v| v.as_table()) {
        if let Some(v) = sheet.get("paper") {
            let paper = v.as_str().ok_or_else(|| invalid("sheet.paper", "a string"))?;
            config.sheet.paper = paper.to_string();
        }
        for (key, slot) in [
            ("width", &mut config.sheet.width),
            ("height", &mut config.sheet.height),
            ("border", &mut config.sheet.border),
            ("lead_in", &mut config.sheet.lead_in),
            ("lead_out", &mut config.sheet.lead_out),
        ] {
            if let Some(v) = sheet.get(key) {
                let mm = as_millimetres(v).ok_or_else(|| invalid(&format!("sheet.{key}"), "a number"))?;
                *slot = Some(mm);
            }
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level") {
            let level = v.as_str().ok_or_else(|| invalid("telemetry.log_level", "a string"))?;
            config.telemetry.log_level = level.to_string();
        }
    }

    Ok(())
}

// TOML keeps integers and floats apart; `width = 270` is fine too
fn as_millimetres(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn parse_search(mode: &str) -> Result<SearchMode, ConfigError> {
    mode.parse().map_err(|e: spieluhr::transpose::ParseSearchModeError| ConfigError::Invalid {
        key: "conversion.search".to_string(),
        message: e.to_string(),
    })
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SpieluhrConfig, sources: &mut ConfigSources) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| env::var(key).ok())
}

/// Apply overrides read through `lookup`, which maps a variable name to
/// its value.
pub fn apply_overrides_from(
    config: &mut SpieluhrConfig,
    sources: &mut ConfigSources,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let invalid = |key: &str, value: &str, expected: &str| ConfigError::Invalid {
        key: key.to_string(),
        message: format!("{value:?} is not {expected}"),
    };

    if let Some(v) = lookup("SPIELUHR_BOX") {
        config.conversion.box_type = v;
        sources.env_overrides.push("SPIELUHR_BOX".to_string());
    }
    if let Some(v) = lookup("SPIELUHR_FILTER") {
        config.conversion.filter = v
            .parse()
            .map_err(|_| invalid("SPIELUHR_FILTER", &v, "a tick count"))?;
        sources.env_overrides.push("SPIELUHR_FILTER".to_string());
    }
    if let Some(v) = lookup("SPIELUHR_TRANSPOSE") {
        let shift = v
            .parse()
            .map_err(|_| invalid("SPIELUHR_TRANSPOSE", &v, "a semitone count"))?;
        config.conversion.transpose = Some(shift);
        sources.env_overrides.push("SPIELUHR_TRANSPOSE".to_string());
    }
    if let Some(v) = lookup("SPIELUHR_SEARCH") {
        config.conversion.search = parse_search(&v)?;
        sources.env_overrides.push("SPIELUHR_SEARCH".to_string());
    }
    if let Some(v) = lookup("SPIELUHR_PAPER") {
        config.sheet.paper = v;
        sources.env_overrides.push("SPIELUHR_PAPER".to_string());
    }

    if let Some(v) = lookup("SPIELUHR_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("SPIELUHR_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Some(v) = lookup("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn parse(toml: &str) -> Result<SpieluhrConfig, ConfigError> {
        let mut config = SpieluhrConfig::default();
        apply_toml(&mut config, toml, Path::new("test.toml"))?;
        Ok(config)
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files_with_override(None);
    }

    #[test]
    fn test_cli_path_is_always_returned() {
        let files = discover_config_files_with_override(Some(Path::new("/nonexistent/spieluhr.toml")));
        assert_eq!(files.last(), Some(&PathBuf::from("/nonexistent/spieluhr.toml")));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse("[conversion]\nbox = \"sankyo15\"\n").unwrap();
        assert_eq!(config.conversion.box_type, "sankyo15");
        // Other values should be defaults
        assert_eq!(config.conversion.filter, 1);
        assert_eq!(config.sheet.paper, "letter");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
[conversion]
box = "teanola30"
filter = 12
transpose = -3
search = "no-octaves"

[sheet]
paper = "legal"
width = 350
border = 5.5
lead_in = 10.0

[telemetry]
log_level = "debug"
"#;
        let config = parse(toml).unwrap();

        assert_eq!(config.conversion.box_type, "teanola30");
        assert_eq!(config.conversion.filter, 12);
        assert_eq!(config.conversion.transpose, Some(-3));
        assert_eq!(config.conversion.search, SearchMode::NoOctaves);
        assert_eq!(config.sheet.paper, "legal");
        assert_eq!(config.sheet.width, Some(350.0));
        assert_eq!(config.sheet.border, Some(5.5));
        assert_eq!(config.sheet.lead_in, Some(10.0));
        assert_eq!(config.sheet.lead_out, None);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_later_files_win_per_key() {
        let mut config = SpieluhrConfig::default();
        apply_toml(&mut config, "[conversion]\nbox = \"sankyo33\"\nfilter = 4\n", Path::new("a.toml")).unwrap();
        apply_toml(&mut config, "[conversion]\nfilter = 8\n", Path::new("b.toml")).unwrap();
        assert_eq!(config.conversion.box_type, "sankyo33");
        assert_eq!(config.conversion.filter, 8);
    }

    #[test]
    fn test_bad_values_name_the_file() {
        let err = parse("[conversion]\nfilter = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("test.toml"));

        let err = parse("[sheet]\nwidth = \"wide\"\n").unwrap_err();
        assert!(err.to_string().contains("sheet.width"));
    }

    #[test]
    fn test_unknown_search_mode_is_invalid() {
        let err = parse("[conversion]\nsearch = \"sideways\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse("[conversion\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sheet]\npaper = \"a4x2\"").unwrap();

        let mut config = SpieluhrConfig::default();
        load_from_file(&mut config, file.path()).unwrap();
        assert_eq!(config.sheet.paper, "a4x2");
    }

    #[test]
    fn test_missing_file() {
        let mut config = SpieluhrConfig::default();
        let err = load_from_file(&mut config, Path::new("/nonexistent/spieluhr.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SPIELUHR_BOX", "sankyo15"),
            ("SPIELUHR_TRANSPOSE", "5"),
            ("SPIELUHR_SEARCH", "octaves"),
            ("RUST_LOG", "spieluhr=trace"),
        ]
        .into_iter()
        .collect();

        let mut config = SpieluhrConfig::default();
        let mut sources = ConfigSources::default();
        apply_overrides_from(&mut config, &mut sources, |k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.conversion.box_type, "sankyo15");
        assert_eq!(config.conversion.transpose, Some(5));
        assert_eq!(config.conversion.search, SearchMode::Octaves);
        assert_eq!(config.telemetry.log_level, "spieluhr=trace");
        assert_eq!(
            sources.env_overrides,
            vec!["SPIELUHR_BOX", "SPIELUHR_TRANSPOSE", "SPIELUHR_SEARCH", "RUST_LOG"]
        );
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = SpieluhrConfig::default();
        let mut sources = ConfigSources::default();
        let err = apply_overrides_from(&mut config, &mut sources, |k| {
            (k == "SPIELUHR_FILTER").then(|| "fast".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("SPIELUHR_FILTER"));
    }
}
