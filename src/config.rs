use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::models::MIN_WATCH_SECONDS;
use crate::sheets::DEFAULT_RANGE;
use crate::youtube::DEFAULT_LIMIT;

pub const DEFAULT_CONFIG_PATH: &str = "ytscript.env";
pub const DEFAULT_WATCH_SECONDS: u64 = 180;

/// Values read from the optional `KEY=VALUE` settings file.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub youtube_api_key: Option<String>,
    pub search_limit: Option<u32>,
    pub watch_seconds: Option<u64>,
    pub service_account_file: Option<PathBuf>,
    pub sheet_id: Option<String>,
    pub sheet_range: Option<String>,
}

/// Settings after defaults are applied. Command-line flags still win over
/// anything in here.
#[derive(Debug, Clone)]
pub struct Settings {
    pub youtube_api_key: Option<String>,
    pub search_limit: u32,
    pub watch_seconds: u64,
    pub service_account_file: Option<PathBuf>,
    pub sheet_id: Option<String>,
    pub sheet_range: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            search_limit: DEFAULT_LIMIT,
            watch_seconds: DEFAULT_WATCH_SECONDS,
            service_account_file: None,
            sheet_id: None,
            sheet_range: DEFAULT_RANGE.to_string(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key.trim() {
                "YOUTUBE_API_KEY" => cfg.youtube_api_key = non_empty(value),
                "SEARCH_LIMIT" => {
                    let limit: u32 = value
                        .parse()
                        .with_context(|| format!("Parsing SEARCH_LIMIT from {}", path.display()))?;
                    cfg.search_limit = Some(limit);
                }
                "WATCH_SECONDS" => {
                    let seconds: u64 = value.parse().with_context(|| {
                        format!("Parsing WATCH_SECONDS from {}", path.display())
                    })?;
                    cfg.watch_seconds = Some(seconds);
                }
                "SERVICE_ACCOUNT_FILE" => {
                    cfg.service_account_file = non_empty(value).map(PathBuf::from)
                }
                "SHEET_ID" => cfg.sheet_id = non_empty(value),
                "SHEET_RANGE" => cfg.sheet_range = non_empty(value),
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

/// Loads settings from `path`, falling back to defaults when the file is
/// absent.
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let defaults = Settings::default();
    let Some(cfg) = read_env_config(path)? else {
        return Ok(defaults);
    };
    let watch_seconds = cfg.watch_seconds.unwrap_or(defaults.watch_seconds);
    if watch_seconds < MIN_WATCH_SECONDS {
        anyhow::bail!(
            "WATCH_SECONDS in {} must be at least {MIN_WATCH_SECONDS}",
            path.display()
        );
    }
    Ok(Settings {
        youtube_api_key: cfg.youtube_api_key,
        search_limit: cfg.search_limit.unwrap_or(defaults.search_limit),
        watch_seconds,
        service_account_file: cfg.service_account_file,
        sheet_id: cfg.sheet_id,
        sheet_range: cfg.sheet_range.unwrap_or(defaults.sheet_range),
    })
}
