//! Startup configuration
//!
//! Values come from the environment (after loading dotenv files) and may be
//! overridden by command-line flags in the binary.

use crate::assistant::{DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_MODEL};
use crate::client::DEFAULT_OLLAMA_URL;
use crate::error::{Error, Result};
use crate::request::ModelOptions;
use crate::toolkit::ToolSettings;
use crate::tools::{SERPAPI_URL, YAHOO_FINANCE_URL};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Secret required at startup
pub const SERPAPI_KEY_VAR: &str = "SERPAPI_API_KEY";
/// Ollama server address, with or without scheme
pub const OLLAMA_HOST_VAR: &str = "OLLAMA_HOST";
/// Model id, `llama3` when unset
pub const MODEL_VAR: &str = "STU_MODEL";
/// Sampling temperature; the model's own default when unset
pub const TEMPERATURE_VAR: &str = "STU_TEMPERATURE";
pub const SERPAPI_URL_VAR: &str = "STU_SERPAPI_URL";
pub const YAHOO_FINANCE_URL_VAR: &str = "STU_YAHOO_FINANCE_URL";

/// Per-user dotenv file, looked up in the home directory
pub const USER_ENV_FILE: &str = ".stu.env";

/// Everything the binary needs to build sessions
#[derive(Debug, Clone)]
pub struct Settings {
    /// Model id bound to every assistant
    pub model: String,
    /// Ollama server address without trailing slash
    pub ollama_url: String,
    pub serpapi_api_key: String,
    pub serpapi_url: String,
    pub yahoo_finance_url: String,
    /// Transcript messages replayed to the model; `None` replays all
    pub history_limit: Option<usize>,
    /// Tool-call rounds allowed per prompt
    pub max_tool_rounds: usize,
    /// Sampling temperature forwarded to the model
    pub temperature: Option<f32>,
}

impl Settings {
    /// Load dotenv files, then read settings from the process environment
    pub fn from_env() -> Result<Self> {
        load_env_files();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the SerpApi key is missing or a URL is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let serpapi_api_key = non_empty(SERPAPI_KEY_VAR).ok_or_else(|| {
            Error::Config(format!(
                "{} is not set. Add it to ./.env or ~/{}",
                SERPAPI_KEY_VAR, USER_ENV_FILE
            ))
        })?;

        let temperature = match non_empty(TEMPERATURE_VAR) {
            Some(value) => Some(value.parse::<f32>().map_err(|e| {
                Error::Config(format!("invalid {} '{}': {}", TEMPERATURE_VAR, value, e))
            })?),
            None => None,
        };

        let settings = Self {
            model: non_empty(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ollama_url: non_empty(OLLAMA_HOST_VAR)
                .map(|host| normalize_host(&host))
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            serpapi_api_key,
            serpapi_url: non_empty(SERPAPI_URL_VAR).unwrap_or_else(|| SERPAPI_URL.to_string()),
            yahoo_finance_url: non_empty(YAHOO_FINANCE_URL_VAR)
                .unwrap_or_else(|| YAHOO_FINANCE_URL.to_string()),
            history_limit: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            temperature,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check URLs and limits after overrides were applied
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("Ollama URL", &self.ollama_url),
            ("SerpApi URL", &self.serpapi_url),
            ("Yahoo Finance URL", &self.yahoo_finance_url),
        ] {
            Url::parse(value)
                .map_err(|e| Error::Config(format!("invalid {} '{}': {}", name, value, e)))?;
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model id must not be empty".to_string()));
        }
        if self.max_tool_rounds == 0 {
            return Err(Error::Config("max tool rounds must be at least 1".to_string()));
        }
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(Error::Config(format!(
                    "temperature must be a non-negative number, got {}",
                    temperature
                )));
            }
        }
        Ok(())
    }

    /// Sampling options for the assistant factory; `None` when nothing is set
    pub fn model_options(&self) -> Option<ModelOptions> {
        self.temperature.map(|temperature| ModelOptions {
            temperature: Some(temperature),
        })
    }

    /// Credentials and endpoints for building toolkits
    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            serpapi_api_key: Some(self.serpapi_api_key.clone()),
            serpapi_url: self.serpapi_url.clone(),
            yahoo_finance_url: self.yahoo_finance_url.clone(),
        }
    }
}

/// `OLLAMA_HOST` may be given without a scheme, as the Ollama CLI accepts
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

/// Load `./.env`, then `~/.stu.env`; variables already set win
fn load_env_files() {
    if let Ok(path) = dotenv::dotenv() {
        debug!(path = %path.display(), "loaded env file");
    }
    if let Some(path) = user_env_path() {
        if path.exists() {
            match dotenv::from_path(&path) {
                Ok(()) => debug!(path = %path.display(), "loaded env file"),
                Err(e) => debug!(path = %path.display(), error = %e, "could not load env file"),
            }
        }
    }
}

fn user_env_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(USER_ENV_FILE))
}
