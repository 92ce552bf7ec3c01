use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::prelude::*;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Annotation credentials, resolved once per process. File keys and the
/// `JPERF_*` environment variables carry the same names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_url: Option<String>,
}

impl Config {
    /// Search order: explicit path, `$JPERF_CONFIG`, `~/.jperf/config.json`,
    /// `./config/jperf.json`, `./.jperf.json`, then environment variables.
    pub fn load(explicit: Option<&Path>) -> Config {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        if let Ok(path) = env::var("JPERF_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".jperf").join("config.json"));
        }
        candidates.push(PathBuf::from("config/jperf.json"));
        candidates.push(PathBuf::from(".jperf.json"));

        for path in &candidates {
            let Ok(text) = fs::read_to_string(path) else {
                continue;
            };
            match serde_json::from_str::<Config>(&text) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    return config.with_env_fallback();
                }
                Err(e) => warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        debug!("No config file found, using environment variables");
        Config::default().with_env_fallback()
    }

    fn with_env_fallback(mut self) -> Config {
        if self.api_key.is_none() {
            self.api_key = env::var("JPERF_API_KEY").ok();
        }
        if self.model.is_none() {
            self.model = env::var("JPERF_MODEL").ok();
        }
        if self.api_url.is_none() {
            self.api_url = env::var("JPERF_API_URL").ok();
        }
        self
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn explicit_file_wins() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"api_key": "k1", "model": "m1"}"#).unwrap();
        let config = Config::load(Some(file.path()));
        assert_eq!(config.api_key.as_deref(), Some("k1"));
        assert_eq!(config.model(), "m1");
        assert_eq!(config.api_url(), DEFAULT_API_URL);
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let config = Config::default();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert!(config.api_key.is_none());
    }
}
