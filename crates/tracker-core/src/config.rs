//! Engine configuration
//!
//! Values come from defaults, optionally overridden by `TRACKER_*`
//! environment variables. Invalid overrides are ignored with a warning.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

pub const ENV_REMINDER_HOUR: &str = "TRACKER_REMINDER_HOUR";
pub const ENV_REMINDER_MINUTE: &str = "TRACKER_REMINDER_MINUTE";
pub const ENV_SEED_DEFAULTS: &str = "TRACKER_SEED_DEFAULTS";
pub const ENV_CACHE_DIR: &str = "TRACKER_CACHE_DIR";

/// Sync engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Local hour reminders fire at, the day before the due date
    pub reminder_hour: u32,
    pub reminder_minute: u32,
    /// Seed the starter records for fresh anonymous sessions
    pub seed_defaults: bool,
    /// Directory of the per-identity bootstrap cache. `None` disables it.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reminder_hour: 9,
            reminder_minute: 0,
            seed_defaults: true,
            cache_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = normalize_text_option(lookup(ENV_REMINDER_HOUR)) {
            match raw.parse::<u32>() {
                Ok(hour) if hour < 24 => self.reminder_hour = hour,
                _ => tracing::warn!("Ignoring invalid {ENV_REMINDER_HOUR}={raw}"),
            }
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_REMINDER_MINUTE)) {
            match raw.parse::<u32>() {
                Ok(minute) if minute < 60 => self.reminder_minute = minute,
                _ => tracing::warn!("Ignoring invalid {ENV_REMINDER_MINUTE}={raw}"),
            }
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_SEED_DEFAULTS)) {
            match parse_bool(&raw) {
                Some(value) => self.seed_defaults = value,
                None => tracing::warn!("Ignoring invalid {ENV_SEED_DEFAULTS}={raw}"),
            }
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_CACHE_DIR)) {
            self.cache_dir = Some(PathBuf::from(raw));
        }
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.reminder_hour, 9);
        assert_eq!(config.reminder_minute, 0);
        assert!(config.seed_defaults);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn overrides_apply() {
        let config = EngineConfig::default().with_overrides(lookup(&[
            (ENV_REMINDER_HOUR, "18"),
            (ENV_REMINDER_MINUTE, " 30 "),
            (ENV_SEED_DEFAULTS, "off"),
            (ENV_CACHE_DIR, "/tmp/tracker-cache"),
        ]));
        assert_eq!(config.reminder_hour, 18);
        assert_eq!(config.reminder_minute, 30);
        assert!(!config.seed_defaults);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/tracker-cache")));
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = EngineConfig::default().with_overrides(lookup(&[
            (ENV_REMINDER_HOUR, "25"),
            (ENV_REMINDER_MINUTE, "abc"),
            (ENV_SEED_DEFAULTS, "maybe"),
            (ENV_CACHE_DIR, "   "),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: EngineConfig = serde_json::from_str(r#"{ "reminder_hour": 7 }"#).unwrap();
        assert_eq!(config.reminder_hour, 7);
        assert!(config.seed_defaults);
        assert!(serde_json::from_str::<EngineConfig>(r#"{ "bogus": 1 }"#).is_err());
    }
}
