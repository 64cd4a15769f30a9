use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const DEFAULT_ORACLE_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ORACLE_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECENT_WINDOW: &str = "1d";
const DEFAULT_MAX_RESULTS: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default)]
    pub executable: Option<PathBuf>,
    #[serde(default = "default_headless")]
    pub headless: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub recent_window: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

fn default_headless() -> bool {
    true
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: default_headless(),
        }
    }
}

impl Settings {
    pub fn client_id(&self) -> AppResult<&str> {
        self.client_id.as_deref().ok_or_else(|| {
            AppError::Config(
                "missing oauth client_id. set GOOGLE_CLIENT_ID or add it to your profile json"
                    .to_string(),
            )
        })
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    pub fn database_url(&self) -> AppResult<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            AppError::Config(
                "missing database_url. set DATABASE_URL or add it to your profile json".to_string(),
            )
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read("GOOGLE_CLIENT_ID") {
            self.client_id = Some(value);
        }
        if let Some(value) = read("GOOGLE_CLIENT_SECRET") {
            self.client_secret = Some(value);
        }
        if let Some(value) = read("DATABASE_URL") {
            self.database_url = Some(value);
        }
        if let Some(value) = read("OPENAI_API_KEY") {
            self.oracle.api_key = Some(value);
        }
        if let Some(value) = read("OPENAI_BASE_URL") {
            self.oracle.base_url = Some(value);
        }
        if let Some(value) = read("CHROME_BIN") {
            self.browser.executable = Some(PathBuf::from(value));
        }
    }
}

impl OracleSettings {
    pub fn api_key(&self) -> AppResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            AppError::Config(
                "missing oracle api_key. set OPENAI_API_KEY or add oracle.api_key to your profile json"
                    .to_string(),
            )
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_ORACLE_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_ORACLE_MODEL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_ORACLE_TIMEOUT_SECS))
    }
}

impl SyncSettings {
    pub fn recent_query(&self) -> String {
        let window = self
            .recent_window
            .as_deref()
            .map(str::trim)
            .filter(|window| !window.is_empty())
            .unwrap_or(DEFAULT_RECENT_WINDOW);
        format!("newer_than:{window}")
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
            .filter(|max| *max > 0)
            .unwrap_or(DEFAULT_MAX_RESULTS)
    }
}

pub fn load(path: PathBuf) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}
