// src/config/analysis.rs
//! External analysis configuration, read once at adapter construction.
//!
//! Source: `config/analysis.json` (path override: `ANALYSIS_CONFIG_PATH`). A missing file
//! means defaults: Wolfram provider with the key taken from `WOLFRAM_APP_ID`.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs, path::Path, path::PathBuf};
use tracing::{info, warn};

pub const DEFAULT_ANALYSIS_CONFIG_PATH: &str = "config/analysis.json";
pub const ENV_ANALYSIS_CONFIG_PATH: &str = "ANALYSIS_CONFIG_PATH";
pub const ENV_ANALYSIS_PROVIDER: &str = "ANALYSIS_PROVIDER";
pub const ENV_ANALYSIS_TIMEOUT_MS: &str = "ANALYSIS_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const MIN_TIMEOUT_MS: u64 = 100;
pub const MAX_TIMEOUT_MS: u64 = 5_000;
pub const MAX_RETRIES: u32 = 1;

/// Value of `api_key` meaning "read the provider's env var".
const API_KEY_FROM_ENV: &str = "ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Wolfram,
    OpenAi,
    Mock,
    Disabled,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Wolfram => "wolfram",
            Provider::OpenAi => "openai",
            Provider::Mock => "mock",
            Provider::Disabled => "disabled",
        }
    }

    /// Env var holding the credential when `api_key` is `"ENV"`.
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            Provider::Wolfram => Some("WOLFRAM_APP_ID"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Mock | Provider::Disabled => None,
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wolfram" => Ok(Provider::Wolfram),
            "openai" => Ok(Provider::OpenAi),
            "mock" => Ok(Provider::Mock),
            "disabled" | "none" => Ok(Provider::Disabled),
            other => anyhow::bail!("Unsupported analysis provider: {other}"),
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_api_key() -> Option<String> {
    Some(API_KEY_FROM_ENV.to_string())
}
fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: Provider,
    /// Literal key, or `"ENV"` to read WOLFRAM_APP_ID / OPENAI_API_KEY (by provider).
    /// After loading this holds the resolved key, or `None` when unavailable.
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Per-attempt bound on the adapter call. Clamped to 100..=5000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries on transport failure. Capped at 1.
    #[serde(default)]
    pub max_retries: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: Provider::default(),
            api_key: default_api_key(),
            endpoint: None,
            model: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: 0,
        }
    }
}

// Never print the key itself.
impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("key_len", &self.api_key.as_ref().map(|k| k.len()))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl AnalysisConfig {
    /// Parse a config file, then apply env overrides, key resolution and sanitization.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config at {}", path.display()))?;
        let cfg: AnalysisConfig = serde_json::from_str(&data)
            .with_context(|| format!("Invalid analysis config at {}", path.display()))?;
        Ok(cfg.finish())
    }

    /// Defaults + env overrides + key resolution (no file).
    pub fn from_env() -> Self {
        Self::default().finish()
    }

    /// Resolve the config path from env, load it, and fall back to `from_env()` when the
    /// file is missing or invalid. Never fails: a missing credential is not fatal.
    pub fn load() -> Self {
        let path = env::var(ENV_ANALYSIS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ANALYSIS_CONFIG_PATH));

        if !path.exists() {
            info!(path = %path.display(), "no analysis config file; using defaults");
            return Self::from_env();
        }
        match Self::load_from_file(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("{e:#}; using defaults");
                Self::from_env()
            }
        }
    }

    fn finish(mut self) -> Self {
        self.apply_env_overrides();
        self.resolve_api_key();
        self.sanitize();
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = env::var(ENV_ANALYSIS_PROVIDER) {
            match raw.parse::<Provider>() {
                Ok(p) => self.provider = p,
                Err(e) => warn!("{e}; keeping provider {}", self.provider.as_str()),
            }
        }
        if let Some(ms) = env::var(ENV_ANALYSIS_TIMEOUT_MS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.timeout_ms = ms;
        }
    }

    fn resolve_api_key(&mut self) {
        let wants_env = self
            .api_key
            .as_deref()
            .map(|k| k.trim().eq_ignore_ascii_case(API_KEY_FROM_ENV))
            .unwrap_or(false);
        if wants_env {
            self.api_key = self
                .provider
                .key_env_var()
                .and_then(|var| env::var(var).ok());
        }
        self.api_key = self
            .api_key
            .take()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
    }

    fn sanitize(&mut self) {
        if self.timeout_ms == 0 {
            self.timeout_ms = DEFAULT_TIMEOUT_MS;
        }
        self.timeout_ms = self.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS);
        self.max_retries = self.max_retries.min(MAX_RETRIES);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total adapter attempts allowed per classification (1 + retries).
    pub fn attempts(&self) -> u32 {
        1 + self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn unique_tmp_file(name: &str, body: &str) -> PathBuf {
        let mut dir = env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("analysis_cfg_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    fn clear_env() {
        for k in [
            ENV_ANALYSIS_PROVIDER,
            ENV_ANALYSIS_TIMEOUT_MS,
            "WOLFRAM_APP_ID",
            "OPENAI_API_KEY",
        ] {
            env::remove_var(k);
        }
    }

    #[test]
    #[serial]
    fn env_key_resolves_by_provider() {
        clear_env();
        env::set_var("OPENAI_API_KEY", " sk-test ");
        let path = unique_tmp_file("a.json", r#"{"provider":"openai","api_key":"env"}"#);
        let cfg = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.provider, Provider::OpenAi);
        assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_env_key_is_not_an_error() {
        clear_env();
        let cfg = AnalysisConfig::from_env();
        assert_eq!(cfg.provider, Provider::Wolfram);
        assert!(cfg.enabled);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    #[serial]
    fn timeout_and_retries_are_sanitized() {
        clear_env();
        let path = unique_tmp_file(
            "b.json",
            r#"{"api_key":"literal","timeout_ms":60000,"max_retries":5}"#,
        );
        let cfg = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.timeout(), Duration::from_millis(MAX_TIMEOUT_MS));
        assert_eq!(cfg.attempts(), 2);
        assert_eq!(cfg.api_key.as_deref(), Some("literal"));

        let path = unique_tmp_file("c.json", r#"{"timeout_ms":0}"#);
        let cfg = AnalysisConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.attempts(), 1);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        env::set_var(ENV_ANALYSIS_PROVIDER, "Mock");
        env::set_var(ENV_ANALYSIS_TIMEOUT_MS, "250");
        let cfg = AnalysisConfig::from_env();
        assert_eq!(cfg.provider, Provider::Mock);
        assert_eq!(cfg.timeout_ms, 250);
        clear_env();
    }

    #[test]
    #[serial]
    fn invalid_file_falls_back_to_defaults() {
        clear_env();
        let path = unique_tmp_file("d.json", "{ not json");
        assert!(AnalysisConfig::load_from_file(&path).is_err());
        env::set_var(ENV_ANALYSIS_CONFIG_PATH, &path);
        let cfg = AnalysisConfig::load();
        env::remove_var(ENV_ANALYSIS_CONFIG_PATH);
        assert_eq!(cfg.provider, Provider::Wolfram);
    }

    #[test]
    fn debug_output_hides_key() {
        let cfg = AnalysisConfig {
            api_key: Some("super-secret".into()),
            ..Default::default()
        };
        let s = format!("{cfg:?}");
        assert!(!s.contains("super-secret"));
        assert!(s.contains("key_len: Some(12)"));
    }
}
