use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

pub const DEFAULT_CONFIG_FILE: &str = "monarch-bridge.json";

pub const DEFAULT_MONARCH_API_URL: &str = "https://api-v3.monarchinitiative.org/v3/api";
pub const DEFAULT_MONARCH_API_V2_URL: &str = "https://api.monarchinitiative.org/api";
pub const DEFAULT_MONARCH_UI_URL: &str = "https://monarchinitiative.org";
pub const DEFAULT_OPENLIBRARY_URL: &str = "https://openlibrary.org";
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const DEFAULT_BIND: &str = "0.0.0.0:3434";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PUBLICATION_CONCURRENCY: usize = 3;

/// On-disk shape of `monarch-bridge.json`. Every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub monarch_api_url: Option<String>,
    #[serde(default)]
    pub monarch_api_v2_url: Option<String>,
    #[serde(default)]
    pub monarch_ui_url: Option<String>,
    #[serde(default)]
    pub openlibrary_url: Option<String>,
    #[serde(default)]
    pub eutils_url: Option<String>,
    #[serde(default)]
    pub ncbi_api_key: Option<String>,
    #[serde(default)]
    pub resolve_publications: Option<bool>,
    #[serde(default)]
    pub publication_concurrency: Option<usize>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub monarch_api_url: String,
    pub monarch_api_v2_url: String,
    pub monarch_ui_url: String,
    pub openlibrary_url: String,
    pub eutils_url: String,
    pub ncbi_api_key: Option<String>,
    pub resolve_publications: bool,
    /// Upper bound on in-flight Open Library / PubMed lookups per process.
    pub publication_concurrency: usize,
    pub request_timeout: Duration,
    pub bind: String,
    pub static_dir: Option<Utf8PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monarch_api_url: DEFAULT_MONARCH_API_URL.to_string(),
            monarch_api_v2_url: DEFAULT_MONARCH_API_V2_URL.to_string(),
            monarch_ui_url: DEFAULT_MONARCH_UI_URL.to_string(),
            openlibrary_url: DEFAULT_OPENLIBRARY_URL.to_string(),
            eutils_url: DEFAULT_EUTILS_URL.to_string(),
            ncbi_api_key: None,
            resolve_publications: true,
            publication_concurrency: DEFAULT_PUBLICATION_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind: DEFAULT_BIND.to_string(),
            static_dir: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the JSON file, then the process environment.
    pub fn resolve(path: Option<&str>) -> Result<Settings, BridgeError> {
        let config = Self::load_file(path)?;
        Self::resolve_config(config, |key| std::env::var(key).ok())
    }

    /// An explicit path must exist; the default file is optional.
    pub fn load_file(path: Option<&str>) -> Result<Config, BridgeError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BridgeError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| BridgeError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config<F>(config: Config, env: F) -> Result<Settings, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| {
            env(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Settings::default();

        let monarch_api_url = env("MONARCH_API_URL")
            .or(config.monarch_api_url)
            .unwrap_or(defaults.monarch_api_url);
        let monarch_api_v2_url = env("MONARCH_API_V2_URL")
            .or(config.monarch_api_v2_url)
            .unwrap_or(defaults.monarch_api_v2_url);
        let monarch_ui_url = env("MONARCH_UI_URL")
            .or(config.monarch_ui_url)
            .unwrap_or(defaults.monarch_ui_url);
        let openlibrary_url = env("OPENLIBRARY_URL")
            .or(config.openlibrary_url)
            .unwrap_or(defaults.openlibrary_url);
        let eutils_url = env("EUTILS_URL")
            .or(config.eutils_url)
            .unwrap_or(defaults.eutils_url);
        let ncbi_api_key = env("NCBI_API_KEY").or(config
            .ncbi_api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()));

        let resolve_publications = match env("MONARCH_RESOLVE_PUBLICATIONS") {
            Some(value) => parse_bool("MONARCH_RESOLVE_PUBLICATIONS", &value)?,
            None => config
                .resolve_publications
                .unwrap_or(defaults.resolve_publications),
        };

        let publication_concurrency = match env("MONARCH_PUBLICATION_CONCURRENCY") {
            Some(value) => value.parse::<usize>().map_err(|_| {
                BridgeError::InvalidConfig(format!("MONARCH_PUBLICATION_CONCURRENCY={value}"))
            })?,
            None => config
                .publication_concurrency
                .unwrap_or(defaults.publication_concurrency),
        };
        if publication_concurrency == 0 {
            return Err(BridgeError::InvalidConfig(
                "publication concurrency must be at least 1".to_string(),
            ));
        }

        let timeout_secs = match env("MONARCH_REQUEST_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                BridgeError::InvalidConfig(format!("MONARCH_REQUEST_TIMEOUT_SECS={value}"))
            })?,
            None => config.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(BridgeError::InvalidConfig(
                "request timeout must be at least one second".to_string(),
            ));
        }

        let bind = env("MONARCH_BIND")
            .or(config.bind)
            .unwrap_or(defaults.bind);
        let static_dir = env("MONARCH_STATIC_DIR")
            .or(config.static_dir)
            .map(Utf8PathBuf::from);

        Ok(Settings {
            monarch_api_url: normalize_base_url(&monarch_api_url)?,
            monarch_api_v2_url: normalize_base_url(&monarch_api_v2_url)?,
            monarch_ui_url: normalize_base_url(&monarch_ui_url)?,
            openlibrary_url: normalize_base_url(&openlibrary_url)?,
            eutils_url: normalize_base_url(&eutils_url)?,
            ncbi_api_key,
            resolve_publications,
            publication_concurrency,
            request_timeout: Duration::from_secs(timeout_secs),
            bind,
            static_dir,
        })
    }
}

fn normalize_base_url(value: &str) -> Result<String, BridgeError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(BridgeError::InvalidConfig(format!(
            "base URL must be http(s): {value}"
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, BridgeError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::InvalidConfig(format!("{key}={value}"))),
    }
}
