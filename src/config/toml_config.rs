//! TOML Configuration with Environment Variable Overrides
//!
//! Every field has a default, so an empty or missing file is a valid config.
//! Environment variables are applied after the file is read.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::commitments::{DEFAULT_FOLLOWUP_HOURS, DEFAULT_MAX_AGE_DAYS};
use crate::commitments::recorder::DEFAULT_TIMEOUT_SECS;
use crate::error::{CommitmentError, Result};

const APP_DIR: &str = "promise-tracker";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
}

fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

fn default_ledger_path() -> PathBuf {
    app_dir().join("promises.jsonl")
}
fn default_max_age_days() -> i64 {
    DEFAULT_MAX_AGE_DAYS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Append script locations, highest priority first.
    #[serde(default = "default_script_candidates")]
    pub script_candidates: Vec<PathBuf>,
    /// Passed before the named flags, e.g. `["add"]` for `commitments add`.
    #[serde(default)]
    pub script_args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_followup_hours")]
    pub default_followup_hours: i64,
    #[serde(default = "default_original_text_chars")]
    pub original_text_chars: usize,
    /// Replaces the built-in promise pattern table when set.
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_followup_hours() -> i64 {
    DEFAULT_FOLLOWUP_HOURS
}
fn default_original_text_chars() -> usize {
    200
}

fn default_script_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("commitments").join("scripts").join("add.sh"));
    }
    candidates.push(app_dir().join("scripts").join("add.sh"));
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("commitments").join("scripts").join("add.sh"));
    }
    candidates
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            script_candidates: default_script_candidates(),
            script_args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_followup_hours: DEFAULT_FOLLOWUP_HOURS,
            original_text_chars: 200,
            patterns: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

pub fn get_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

/// Parse `path` if it exists (defaults otherwise), then apply env overrides.
pub fn load_from_path(path: &Path) -> Result<TomlConfig> {
    let config = if path.exists() {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str::<TomlConfig>(&contents).map_err(|source| {
            CommitmentError::Config {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!("Loaded TOML config from {:?}", path);
        config
    } else {
        TomlConfig::default()
    };
    Ok(apply_env_overrides(config))
}

/// Load from the default location; an unreadable file falls back to defaults.
pub fn load_toml_config() -> TomlConfig {
    let path = get_config_path();
    match load_from_path(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring config {:?}: {}", path, e);
            apply_env_overrides(TomlConfig::default())
        }
    }
}

fn apply_env_overrides(config: TomlConfig) -> TomlConfig {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply `PROMISE_TRACKER_*` overrides read through `lookup`. Empty or
/// unparseable values leave the field alone.
pub fn apply_overrides<F>(mut config: TomlConfig, lookup: F) -> TomlConfig
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(ledger) = var("PROMISE_TRACKER_LEDGER") {
        config.ledger.path = PathBuf::from(ledger);
    }

    if let Some(script) = var("PROMISE_TRACKER_SCRIPT") {
        config.guard.script_candidates.insert(0, PathBuf::from(script));
    }

    if let Some(s) = var("PROMISE_TRACKER_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
        config.guard.timeout_secs = s;
    }

    if let Some(h) = var("PROMISE_TRACKER_DEFAULT_HOURS").and_then(|v| v.parse::<i64>().ok()) {
        config.guard.default_followup_hours = h;
    }

    if let Some(d) = var("PROMISE_TRACKER_MAX_AGE_DAYS").and_then(|v| v.parse::<i64>().ok()) {
        config.ledger.max_age_days = d;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.ledger.max_age_days, 7);
        assert_eq!(config.guard.timeout_secs, 10);
        assert_eq!(config.guard.default_followup_hours, 24);
        assert!(config.guard.enabled);
        assert!(config.tracker.enabled);
        assert!(config.ledger.path.ends_with("promise-tracker/promises.jsonl"));
        assert!(config
            .guard
            .script_candidates
            .iter()
            .all(|c| c.ends_with("scripts/add.sh")));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[guard]\nscript_candidates = [\"/opt/commitments/add.sh\"]\nscript_args = [\"add\"]\n\n[ledger]\npath = \"/tmp/p.jsonl\"\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.ledger.path, PathBuf::from("/tmp/p.jsonl"));
        assert_eq!(config.ledger.max_age_days, 7);
        assert_eq!(config.guard.script_args, vec!["add".to_string()]);
        assert!(config.guard.patterns.is_none());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[guard\nenabled = yes").unwrap();
        assert!(matches!(load_from_path(&path), Err(CommitmentError::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let config = load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.guard.original_text_chars, 200);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("PROMISE_TRACKER_SCRIPT", "/usr/local/bin/add-commitment"),
            ("PROMISE_TRACKER_TIMEOUT_SECS", "3"),
            ("PROMISE_TRACKER_MAX_AGE_DAYS", "not-a-number"),
            ("PROMISE_TRACKER_LEDGER", ""),
        ]
        .into_iter()
        .collect();

        let defaults = TomlConfig::default();
        let config = apply_overrides(defaults.clone(), |key| env.get(key).map(|v| v.to_string()));
        assert_eq!(
            config.guard.script_candidates[0],
            PathBuf::from("/usr/local/bin/add-commitment")
        );
        assert_eq!(config.guard.timeout_secs, 3);
        assert_eq!(config.ledger.max_age_days, defaults.ledger.max_age_days);
        assert_eq!(config.ledger.path, defaults.ledger.path);
    }

    #[test]
    fn test_no_overrides_is_identity() {
        let defaults = TomlConfig::default();
        assert_eq!(apply_overrides(defaults.clone(), |_| None), defaults);
    }
}
