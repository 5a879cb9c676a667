//! certsweep configuration stored at `~/.certsweep/`.
//!
//! `~/.certsweep/config.json` holds scan defaults so they don't have to be
//! repeated on every invocation. `CERTSWEEP_CONFIG` points at a different
//! file. Precedence for every setting: command-line flag, then this file,
//! then the built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::report::OutputFormat;
use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".certsweep";
const CONFIG_FILE_NAME: &str = "config.json";
const CERTSWEEP_CONFIG_ENV: &str = "CERTSWEEP_CONFIG";

/// Persisted scan defaults. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    /// Report format (`csv` or `json`)
    pub format: Option<OutputFormat>,
    /// Maximum tunnels open at once
    pub max_tunnels: Option<usize>,
    /// Remote port the tunnels forward to
    pub remote_port: Option<u16>,
    /// Wait for the tunnel's first line of output, e.g. `30s`
    pub ready_timeout: Option<String>,
    /// Wait for the tunnel's local port to open, e.g. `30s`
    pub port_timeout: Option<String>,
    /// TLS connect + handshake timeout, e.g. `10s`
    pub handshake_timeout: Option<String>,
    /// Overall scan deadline, e.g. `15m`
    pub timeout: Option<String>,
    /// Namespace applied to every context
    pub namespace: Option<String>,
}

/// Path to the defaults file: `$CERTSWEEP_CONFIG` or `~/.certsweep/config.json`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CERTSWEEP_CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load scan defaults, returning empty defaults if no file exists.
pub fn load_defaults() -> Result<ScanDefaults> {
    match config_path() {
        Some(path) => load_defaults_from(&path),
        None => Ok(ScanDefaults::default()),
    }
}

/// Load scan defaults from `path`, returning empty defaults if it is missing.
pub fn load_defaults_from(path: &Path) -> Result<ScanDefaults> {
    if !path.exists() {
        return Ok(ScanDefaults::default());
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| Error::command_failed(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::command_failed(format!("failed to parse {}: {}", path.display(), e)))
}

/// Parse a human-friendly duration.
///
/// Supports `Nh` (hours), `Nm` (minutes), `Ns` (seconds) and `Nms`
/// (milliseconds); a bare number is seconds.
/// Examples: "1h", "30m", "45s", "500ms", "90".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = || {
        Error::validation(format!(
            "invalid duration '{}', expected e.g. 1h, 30m, 45s, 500ms",
            s
        ))
    };

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse().map(Duration::from_millis).map_err(|_| invalid())
    } else if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(n * 3600))
    } else if let Some(minutes) = s.strip_suffix('m') {
        let n: u64 = minutes.parse().map_err(|_| invalid())?;
        Ok(Duration::from_secs(n * 60))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse().map(Duration::from_secs).map_err(|_| invalid())
    } else {
        s.parse().map(Duration::from_secs).map_err(|_| invalid())
    }
}

/// Resolve an optional duration from flag, then file, then `fallback`.
pub fn pick_duration(
    flag: Option<&str>,
    file: Option<&str>,
    fallback: Duration,
) -> Result<Duration> {
    match flag.or(file) {
        Some(raw) => parse_duration(raw),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serde_roundtrip() {
        let defaults = ScanDefaults {
            format: Some(OutputFormat::Json),
            max_tunnels: Some(4),
            remote_port: Some(8443),
            ready_timeout: Some("10s".to_string()),
            port_timeout: None,
            handshake_timeout: Some("5s".to_string()),
            timeout: Some("15m".to_string()),
            namespace: Some("default".to_string()),
        };

        let json = serde_json::to_string(&defaults).unwrap();
        let parsed: ScanDefaults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, defaults);
    }

    #[test]
    fn partial_file_leaves_other_fields_empty() {
        let parsed: ScanDefaults = serde_json::from_str(r#"{"max_tunnels": 2}"#).unwrap();
        assert_eq!(parsed.max_tunnels, Some(2));
        assert!(parsed.format.is_none());
        assert!(parsed.timeout.is_none());
    }

    #[test]
    fn missing_file_gives_empty_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_defaults_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, ScanDefaults::default());
    }

    #[test]
    fn reads_defaults_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"format": "json", "remote_port": 9443}"#).unwrap();

        let loaded = load_defaults_from(&path).unwrap();
        assert_eq!(loaded.format, Some(OutputFormat::Json));
        assert_eq!(loaded.remote_port, Some(9443));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_defaults_from(&path).is_err());
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration(" 90 ").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn flag_beats_file_beats_fallback() {
        let fallback = Duration::from_secs(30);
        assert_eq!(
            pick_duration(Some("5s"), Some("10s"), fallback).unwrap(),
            Duration::from_secs(5)
        );
        assert_eq!(
            pick_duration(None, Some("10s"), fallback).unwrap(),
            Duration::from_secs(10)
        );
        assert_eq!(pick_duration(None, None, fallback).unwrap(), fallback);
    }
}
