use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::Split;

pub const DEFAULT_SENDER: &str = "enviodigital@bancoedwards.cl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default = "default_friend_id")]
    pub friend_id: String,
    #[serde(default = "default_split")]
    pub split: f64,
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default)]
    pub maildir: Option<String>,
}

fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}

fn default_friend_id() -> String {
    "0".to_string()
}

fn default_split() -> f64 {
    Split::DEFAULT_RATIO
}

fn default_template() -> String {
    "banco_chile".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            sender: default_sender(),
            friend_id: default_friend_id(),
            split: default_split(),
            template: default_template(),
            maildir: None,
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("splitsync")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("splitsync")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Apply `SPLITSYNC_*` overrides on top of the file settings.
pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("SPLITSYNC_DATA_DIR") {
        settings.data_dir = v;
    }
    if let Some(v) = lookup("SPLITSYNC_SENDER") {
        settings.sender = v;
    }
    if let Some(v) = lookup("SPLITSYNC_FRIEND_ID") {
        settings.friend_id = v;
    }
    if let Some(v) = lookup("SPLITSYNC_SPLIT") {
        settings.split = v
            .trim()
            .parse()
            .map_err(|_| SyncError::Settings(format!("SPLITSYNC_SPLIT is not a number: {v}")))?;
    }
    if let Some(v) = lookup("SPLITSYNC_MAILDIR") {
        settings.maildir = Some(v);
    }
    Ok(settings)
}

/// Who we are on each collaborator. Required before any batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub mail_user: String,
    pub ledger_user_id: String,
    pub ledger_user_email: String,
}

impl Credentials {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SyncError::Credentials(format!("{key} is not set")))
        };
        Ok(Self {
            mail_user: require("SPLITSYNC_MAIL_USER")?,
            ledger_user_id: require("SPLITSYNC_LEDGER_USER_ID")?,
            ledger_user_email: require("SPLITSYNC_LEDGER_USER_EMAIL")?,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Process-wide configuration, built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub store_path: PathBuf,
    pub ledger_path: PathBuf,
    pub maildir: PathBuf,
    pub logs_dir: PathBuf,
    pub sender: String,
    pub template: String,
    pub split: Split,
}

impl Config {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.split) {
            return Err(SyncError::Settings(format!(
                "split must be between 0 and 1, got {}",
                settings.split
            )));
        }
        let data_dir = PathBuf::from(shellexpand_path(&settings.data_dir));
        let maildir = settings
            .maildir
            .as_deref()
            .map(|p| PathBuf::from(shellexpand_path(p)))
            .unwrap_or_else(|| data_dir.join("Maildir"));
        Ok(Self {
            store_path: data_dir.join("transactions.json"),
            ledger_path: data_dir.join("ledger.json"),
            logs_dir: data_dir.join("logs"),
            maildir,
            data_dir,
            sender: settings.sender.clone(),
            template: settings.template.clone(),
            split: Split {
                ratio: settings.split,
                friend_id: settings.friend_id.clone(),
            },
        })
    }

    /// Settings file, then `.env` and process environment.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let settings = apply_env_overrides(load_settings(), |key| std::env::var(key).ok())?;
        debug!(data_dir = %settings.data_dir, "loaded settings");
        Self::from_settings(&settings)
    }
}
