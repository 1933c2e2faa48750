// src/config/mod.rs
//! Service configuration (`config/scraper.toml`).
//!
//! Lookup order for the file: `$SCRAPER_CONFIG_PATH`, then
//! `config/scraper.toml`. A missing default file means built-in defaults;
//! a missing file named by the env var is an error. Every key is optional.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sentiment::DEFAULT_CACHE_CAPACITY;

pub const ENV_CONFIG_PATH: &str = "SCRAPER_CONFIG_PATH";
pub const ENV_MODEL_PATH: &str = "SENTIMENT_MODEL_PATH";
pub const ENV_STORE_PATH: &str = "HEADLINE_STORE_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/scraper.toml";

const MAX_HEADLINES_CAP: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentSection {
    /// Linear model JSON. `None` runs keyword-only.
    pub model_path: Option<PathBuf>,
    pub cache_capacity: usize,
}

impl Default for SentimentSection {
    fn default() -> Self {
        Self {
            model_path: Some(PathBuf::from("models/finance_headlines.json")),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSection {
    pub fetch_timeout_secs: u64,
    pub default_max_headlines: usize,
    pub max_headlines_per_source: usize,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            default_max_headlines: 20,
            max_headlines_per_source: 10,
        }
    }
}

impl ScrapeSection {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Snapshot file for `JsonFileStore`. `None` keeps headlines in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sentiment: SentimentSection,
    pub scrape: ScrapeSection,
    pub store: StoreSection,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing scraper config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File lookup (see module docs) followed by env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
            if pb.exists() {
                Self::load_from(&pb)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    /// Empty values disable the component (`SENTIMENT_MODEL_PATH=""` → keyword-only).
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var(ENV_MODEL_PATH) {
            self.sentiment.model_path = non_empty_path(&v);
        }
        if let Ok(v) = std::env::var(ENV_STORE_PATH) {
            self.store.path = non_empty_path(&v);
        }
    }

    /// Clamp out-of-range values back to something usable.
    fn sanitize(&mut self) {
        let defaults = AppConfig::default();
        if self.sentiment.cache_capacity == 0 {
            self.sentiment.cache_capacity = defaults.sentiment.cache_capacity;
        }
        if self.scrape.fetch_timeout_secs == 0 {
            self.scrape.fetch_timeout_secs = defaults.scrape.fetch_timeout_secs;
        }
        self.scrape.default_max_headlines = self
            .scrape
            .default_max_headlines
            .clamp(1, MAX_HEADLINES_CAP);
        self.scrape.max_headlines_per_source = self
            .scrape
            .max_headlines_per_source
            .clamp(1, MAX_HEADLINES_CAP);
        if self
            .sentiment
            .model_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.sentiment.model_path = None;
        }
        if self
            .store
            .path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            self.store.path = None;
        }
    }
}

fn non_empty_path(v: &str) -> Option<PathBuf> {
    let t = v.trim();
    (!t.is_empty()).then(|| PathBuf::from(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [scrape]
            default_max_headlines = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scrape.default_max_headlines, 5);
        assert_eq!(cfg.scrape.max_headlines_per_source, 10);
        assert_eq!(cfg.sentiment.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(cfg.store.path.is_none());
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [sentiment]
            model_path = ""
            cache_capacity = 0
            [scrape]
            fetch_timeout_secs = 0
            default_max_headlines = 0
            max_headlines_per_source = 500
            "#,
        )
        .unwrap();
        assert!(cfg.sentiment.model_path.is_none());
        assert_eq!(cfg.sentiment.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(cfg.scrape.fetch_timeout_secs, 30);
        assert_eq!(cfg.scrape.default_max_headlines, 1);
        assert_eq!(cfg.scrape.max_headlines_per_source, 100);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(AppConfig::from_toml_str("[scrape\nfoo = ").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_path_and_overrides() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_MODEL_PATH);
        env::remove_var(ENV_STORE_PATH);

        // No file in CWD → defaults
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg, AppConfig::default());

        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[store]\npath = \"x/headlines.json\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_MODEL_PATH, "");
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.store.path, Some(PathBuf::from("x/headlines.json")));
        assert!(cfg.sentiment.model_path.is_none());

        env::set_var(ENV_STORE_PATH, "y.json");
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.store.path, Some(PathBuf::from("y.json")));

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(AppConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_MODEL_PATH);
        env::remove_var(ENV_STORE_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
