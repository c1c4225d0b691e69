use crate::constants::{
    DEFAULT_LOG_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECONDS, ENV_OUTPUT_DIR, ENV_XML_URL,
    SEMA_SOURCE_NAME, SEMA_XML_URL,
};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub timeout_seconds: u64,
    pub user_agent: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: SEMA_SOURCE_NAME.to_string(),
            url: SEMA_XML_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub log_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_OUTPUT_DIR.to_string(),
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SEMA_XML_URL` / `SEMA_OUTPUT_DIR` from the process environment.
    /// Returns the variables that were applied.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(url) = lookup(ENV_XML_URL).filter(|v| !v.trim().is_empty()) {
            self.source.url = url;
            applied.push(ENV_XML_URL);
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output.dir = dir;
            applied.push(ENV_OUTPUT_DIR);
        }
        applied
    }

    fn validate(&self) -> Result<()> {
        if self.source.name.trim().is_empty() {
            return Err(ScraperError::Config("source.name must not be empty".into()));
        }
        if self.source.url.trim().is_empty() {
            return Err(ScraperError::Config("source.url must not be empty".into()));
        }
        if self.source.timeout_seconds == 0 {
            return Err(ScraperError::Config(
                "source.timeout_seconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
