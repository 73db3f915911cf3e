use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::types::{Category, DEFAULT_IDENTITY_KEYS, DEFAULT_URL_KEYS};

pub const CONFIG_ENV: &str = "CONSENT_OPTIONS_CONFIG";
pub const DATA_DIR_ENV: &str = "CONSENT_OPTIONS_DATA_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Top-level settings. Every section is optional in the TOML file.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory used to resolve relative sources and for the newest-file scan.
    pub search_dir: PathBuf,
    pub loader: LoaderConfig,
    pub extractor: ExtractorConfig,
    pub noise: NoiseConfig,
    pub dictionaries: DictionaryOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_dir: default_search_dir(),
            loader: LoaderConfig::default(),
            extractor: ExtractorConfig::default(),
            noise: NoiseConfig::default(),
            dictionaries: DictionaryOverrides::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoaderConfig {
    pub archive_extension: String,
    pub data_extensions: Vec<String>,
    /// Archive member holding the NDJSON export is the first whose name ends with this.
    pub member_suffix: String,
    pub url_keys: Vec<String>,
    pub identity_keys: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            archive_extension: "zip".to_string(),
            data_extensions: vec!["json".to_string(), "ndjson".to_string()],
            member_suffix: "data.json".to_string(),
            url_keys: to_strings(DEFAULT_URL_KEYS),
            identity_keys: to_strings(DEFAULT_IDENTITY_KEYS),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractorConfig {
    pub button_fields: Vec<String>,
    pub label_keys: Vec<String>,
    pub max_label_chars: usize,
    pub max_label_words: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            button_fields: to_strings(&[
                "buttons", "buttonList", "buttonsFound", "buttonTexts", "detectedButtons", "cta",
                "actionButtons", "controls", "options", "consentOptions", "nodeText", "innerText",
                "textContent", "menu",
            ]),
            label_keys: to_strings(&["text", "label", "value", "title", "ariaLabel"]),
            max_label_chars: 60,
            max_label_words: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NoiseConfig {
    pub denylist: Vec<String>,
    /// Strings of at most this many characters are rejected.
    pub max_short_len: usize,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            denylist: to_strings(&["none", "None", "400", "0px", "primary", "Medium", "Secure", "/"]),
            max_short_len: 2,
        }
    }
}

/// Per-category replacements for the built-in phrase and keyword tables.
/// A category named here replaces the built-in entries for that category only.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DictionaryOverrides {
    pub phrases: BTreeMap<Category, Vec<String>>,
    pub keywords: BTreeMap<Category, Vec<String>>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&raw, path)
    }

    fn from_toml(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse { path: origin.to_path_buf(), source })
    }

    /// Explicit path, then `CONSENT_OPTIONS_CONFIG`, then the platform config
    /// file if it exists, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::from_file(Path::new(&path));
        }
        match platform_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn platform_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "consent-observatory", "consent-options")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn default_search_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from("data").join("examples"),
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
