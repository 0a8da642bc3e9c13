use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "progress-tracker";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "PROGRESS_TRACKER_CONFIG_PATH";
const API_URL_ENV_VAR: &str = "PROGRESS_TRACKER_API_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://progress-tracker-1-45pq.onrender.com/api/";

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub success: &'static str,
    pub failure: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        paint(self.accent, self.reset, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        paint(self.muted, self.reset, text)
    }

    pub fn successize(&self, text: &str) -> String {
        paint(self.success, self.reset, text)
    }

    pub fn failurize(&self, text: &str) -> String {
        paint(self.failure, self.reset, text)
    }
}

fn paint(color: &str, reset: &str, text: &str) -> String {
    if color.is_empty() {
        text.to_string()
    } else {
        format!("{color}{text}{reset}")
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name) {
        Some(ref name) if name == "noir" => Palette {
            accent: "\x1b[38;5;208m",
            muted: "\x1b[38;5;250m",
            success: "\x1b[38;5;114m",
            failure: "\x1b[38;5;203m",
            reset: "\x1b[0m",
        },
        Some(ref name) if name == "solarized" => Palette {
            accent: "\x1b[38;5;108m",
            muted: "\x1b[38;5;250m",
            success: "\x1b[38;5;64m",
            failure: "\x1b[38;5;160m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            accent: "",
            muted: "",
            success: "",
            failure: "",
            reset: "",
        },
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let cleaned = canonical_key(raw);
    if cleaned.is_empty() {
        return Some("default".into());
    }

    match cleaned.as_str() {
        "vanilla" | "light" => Some("default".to_string()),
        "dark" | "dark_mode" | "darkmode" => Some("noir".to_string()),
        other => Some(other.to_string()),
    }
}

/// Lowercases and collapses runs of separators into single underscores.
pub fn canonical_key(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

/// Which path the server exposes for creating reminders.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderEndpoint {
    #[default]
    CreateReminder,
    Reminders,
}

impl ReminderEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::CreateReminder => "create-reminder/",
            Self::Reminders => "reminders/",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match canonical_key(raw).as_str() {
            "create_reminder" => Ok(Self::CreateReminder),
            "reminders" => Ok(Self::Reminders),
            other => Err(AppError::invalid_input(format!(
                "unknown reminder endpoint '{other}' (expected create-reminder or reminders)"
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub reminder_endpoint: ReminderEndpoint,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Config {
    pub fn api_base_url(&self) -> &str {
        self.api_base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub reminder_endpoint: Option<ReminderEndpoint>,
    pub theme: Option<String>,
    pub aliases: HashMap<String, String>,
}

pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    let mut load = match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    };
    load.config = apply_env(load.config);
    load
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "falling back to default config");
            ConfigLoad {
                config: Config::default(),
                error: Some(err),
            }
        }
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(normalize_config_theme(config))
}

fn apply_env(mut config: Config) -> Config {
    if let Ok(url) = std::env::var(API_URL_ENV_VAR)
        && !url.trim().is_empty()
    {
        config.api_base_url = Some(url.trim().to_string());
    }
    config
}

fn normalize_config_theme(mut config: Config) -> Config {
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(url) = overrides.api_base_url.as_ref() {
        merged.api_base_url = Some(url.clone());
    }

    if let Some(endpoint) = overrides.reminder_endpoint {
        merged.reminder_endpoint = endpoint;
    }

    if let Some(theme) = overrides.theme.as_ref()
        && let Some(normalized) = canonical_theme_name(theme)
    {
        merged.theme = Some(normalized);
    }

    for (alias, value) in overrides.aliases.iter() {
        merged.aliases.insert(alias.clone(), value.clone());
    }

    merged
}
