use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{MetabaseError, MetabaseResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub metabase: MetabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetabaseConfig {
    /// Base URL of the Metabase instance, without the `/api` suffix.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// When set, requests authenticate with `X-API-KEY` instead of a session.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            password: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// How requests authenticate against Metabase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    Session { username: String, password: String },
    ApiKey(String),
}

impl MetabaseConfig {
    /// Overlays `METABASE_*` environment variables onto file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty("METABASE_URL") {
            self.url = url;
        }
        if let Some(username) = non_empty("METABASE_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = non_empty("METABASE_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(api_key) = non_empty("METABASE_API_KEY") {
            self.api_key = Some(api_key);
        }
    }

    /// API key takes precedence; otherwise both session credentials are required.
    pub fn auth_method(&self) -> MetabaseResult<AuthMethod> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(AuthMethod::ApiKey(key.clone()));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(AuthMethod::Session {
                    username: username.clone(),
                    password: password.clone(),
                })
            }
            _ => Err(MetabaseError::Config(
                "either METABASE_API_KEY or both METABASE_USERNAME and METABASE_PASSWORD are required"
                    .into(),
            )),
        }
    }

    pub fn validate(&self) -> MetabaseResult<()> {
        if self.url.trim().is_empty() {
            return Err(MetabaseError::Config("METABASE_URL is required".into()));
        }
        self.auth_method().map(|_| ())
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }

    None
}

pub fn parse_config(content: &str) -> MetabaseResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

/// Loads configuration from `explicit` or the default lookup locations, then
/// applies environment overrides. A missing file is not an error when the
/// environment supplies everything.
pub fn load_config(explicit: Option<&Path>) -> MetabaseResult<AppConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => resolve_config_path(),
    };

    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)?;
            let config = parse_config(&content)?;
            tracing::info!(path = %path.display(), "config loaded");
            config
        }
        None => {
            tracing::debug!("no config.toml found; using environment only");
            AppConfig::default()
        }
    };

    config.metabase.apply_env();
    config.metabase.validate()?;
    Ok(config)
}
