//! Runtime configuration
//!
//! Resolution chain: CLI flag > environment (including `.env`) > default.

use std::path::PathBuf;

use url::Url;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

const APP_DIR: &str = "mesocycle-planner";
const DB_FILE: &str = "mesocycle-planner.db";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value}")]
  Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
  pub database_path: PathBuf,
  pub api_key: Option<String>,
  pub model: String,
  pub api_url: Url,
  pub max_tokens: u32,
}

impl AppConfig {
  /// Load from environment variables, after reading `.env` if present
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();
    Self::from_vars(|key| std::env::var(key).ok())
  }

  fn from_vars<F>(var: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let database_path = var("MESOCYCLE_DB_PATH")
      .filter(|v| !v.trim().is_empty())
      .map(PathBuf::from)
      .unwrap_or_else(default_db_path);

    let api_key = var("ANTHROPIC_API_KEY").filter(|v| !v.trim().is_empty());
    let model = var("MESOCYCLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let api_url_raw = var("MESOCYCLE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = Url::parse(&api_url_raw).map_err(|_| ConfigError::Invalid {
      key: "MESOCYCLE_API_URL".to_string(),
      value: api_url_raw.clone(),
    })?;

    let max_tokens = match var("MESOCYCLE_MAX_TOKENS") {
      Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "MESOCYCLE_MAX_TOKENS".to_string(),
        value: raw.clone(),
      })?,
      None => DEFAULT_MAX_TOKENS,
    };

    Ok(Self {
      database_path,
      api_key,
      model,
      api_url,
      max_tokens,
    })
  }

  /// Apply a `--db-path` override
  pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
    if let Some(path) = path {
      self.database_path = path;
    }
    self
  }
}

/// `<data dir>/mesocycle-planner/mesocycle-planner.db`
fn default_db_path() -> PathBuf {
  dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join(APP_DIR)
    .join(DB_FILE)
}
