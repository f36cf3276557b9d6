use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;

/// Application configuration loaded from disk and merged with overrides.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Model asked for on every generation request.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the hosted backend. Implementor crates fall back to their
    /// own environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Root of the backend's REST surface.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Delay between reveal ticks, in milliseconds. Chosen for perceived
    /// typing speed; any positive duration is correct.
    #[serde(default = "default_reveal_interval_ms")]
    pub reveal_interval_ms: u64,
    /// Optional cap on one backend call. Off by default.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            reveal_interval_ms: default_reveal_interval_ms(),
            request_timeout_ms: None,
        }
    }
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub reveal_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

impl Config {
    /// Load configuration, optionally applying overrides. Merges
    /// `~/.prompttalk/config.toml`, compiled-in defaults, and any values
    /// provided in `overrides` (highest precedence).
    pub fn load_with_overrides(overrides: ConfigOverrides) -> Self {
        let cfg = Self::load_from_toml().unwrap_or_default();
        cfg.apply_overrides(overrides)
    }

    fn load_from_toml() -> Option<Self> {
        let dir = prompttalk_dir().ok()?;
        Self::load_from_toml_in(&dir)
    }

    fn load_from_toml_in(dir: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(dir.join("config.toml")).ok()?;
        toml::from_str(&contents).ok()
    }

    fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        let ConfigOverrides {
            model,
            api_key,
            base_url,
            reveal_interval_ms,
            request_timeout_ms,
        } = overrides;
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(api_key) = api_key {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(interval) = reveal_interval_ms {
            self.reveal_interval_ms = interval;
        }
        if let Some(timeout) = request_timeout_ms {
            self.request_timeout_ms = Some(timeout);
        }
        self
    }

    /// Reveal tick period. A zero configuration value is clamped up to one
    /// millisecond so the loop always suspends between ticks.
    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.reveal_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_reveal_interval_ms() -> u64 {
    20
}

/// Returns the path to the PromptTalk configuration directory, which is
/// `~/.prompttalk`. Does not verify that the directory exists.
pub fn prompttalk_dir() -> std::io::Result<PathBuf> {
    let mut p = home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    p.push(".prompttalk");
    Ok(p)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: Config = toml::from_str("model = \"gemini-1.5-pro\"").expect("parse config");
        assert_eq!(cfg.model, "gemini-1.5-pro");
        assert_eq!(cfg.base_url, default_base_url());
        assert_eq!(cfg.reveal_interval_ms, 20);
        assert_eq!(cfg.request_timeout_ms, None);
    }

    #[test]
    fn overrides_take_precedence() {
        let cfg = Config::default().apply_overrides(ConfigOverrides {
            model: Some("gemini-2.0-flash".to_string()),
            reveal_interval_ms: Some(5),
            request_timeout_ms: Some(30_000),
            ..Default::default()
        });
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.reveal_interval_ms, 5);
        assert_eq!(cfg.request_timeout(), Some(Duration::from_millis(30_000)));
    }

    #[test]
    fn loads_config_toml_from_directory() {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::write(
            dir.path().join("config.toml"),
            "model = \"gemini-1.5-flash\"\nreveal_interval_ms = 1\napi_key = \"k\"\n",
        )
        .expect("write config");

        let cfg = Config::load_from_toml_in(dir.path()).expect("config parses");
        assert_eq!(cfg.reveal_interval_ms, 1);
        assert_eq!(cfg.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn zero_interval_is_clamped_to_a_positive_duration() {
        let cfg = Config {
            reveal_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.reveal_interval(), Duration::from_millis(1));
    }
}
