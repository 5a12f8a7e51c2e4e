//! Application settings loaded from `settings.toml`.
//!
//! The file lives in the platform config directory:
//! - Linux: ~/.config/upload-preview/settings.toml
//! - macOS: ~/Library/Application Support/upload-preview/settings.toml
//! - Windows: %APPDATA%\upload-preview\settings.toml
//!
//! `UPLOAD_PREVIEW_CONFIG_DIR` overrides the directory. Every key is optional;
//! a missing file means "all defaults".
//!
//! ```toml
//! [service]
//! endpoint = "https://example.com/api/process"
//! mode = "multipart"          # or "url-reference"
//! field_name = "file"
//! api_key = "..."             # sent as X-API-Key when present
//! timeout_secs = 60
//! max_response_bytes = 67108864
//!
//! [limits]
//! max_upload_bytes = 10485760
//! accepted_types = ["image/jpeg", "image/png"]
//!
//! [general]
//! theme = "dark"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::state::policy::{UploadPolicy, DEFAULT_ACCEPTED_TYPES, DEFAULT_MAX_UPLOAD_BYTES};

const CONFIG_DIR_ENV: &str = "UPLOAD_PREVIEW_CONFIG_DIR";
const CONFIG_FILE: &str = "settings.toml";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/process";
pub const DEFAULT_FIELD_NAME: &str = "file";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Ceiling for any response body read from the service (64 MiB)
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid endpoint '{0}'")]
    Endpoint(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// How the file reaches the processing service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// One multipart POST carrying the file bytes
    #[default]
    Multipart,
    /// POST with `?url=<document>` and an API key header, no body
    UrlReference,
}

impl std::str::FromStr for RequestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multipart" => Ok(RequestMode::Multipart),
            "url-reference" | "url" => Ok(RequestMode::UrlReference),
            other => Err(format!("unknown request mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub mode: RequestMode,
    /// Multipart field name for the file part
    pub field_name: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_response_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            mode: RequestMode::default(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ServiceConfig {
    /// Parsed endpoint URL.
    pub fn endpoint_url(&self) -> Result<url::Url, ConfigError> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::Endpoint(self.endpoint.clone()))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            _ => Err(ConfigError::Endpoint(self.endpoint.clone())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_upload_bytes: u64,
    pub accepted_types: Vec<String>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LimitsConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.accepted_types.clone(), self.max_upload_bytes)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    pub theme: ThemeChoice,
}

/// All user settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceConfig,
    pub limits: LimitsConfig,
    pub general: GeneralConfig,
}

/// Directory holding `settings.toml`
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }

    let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
    path.push("upload-preview");
    Some(path)
}

/// Default location of the settings file
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Load settings from an explicit path.
///
/// A missing file is not an error: defaults are returned.
pub fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let settings: Settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    settings.service.endpoint_url()?;
    Ok(settings)
}

/// Load settings, falling back to defaults when the file is broken.
///
/// Returns the settings plus a warning for the log when the fallback kicked in.
pub fn load(path: Option<&Path>) -> (Settings, Option<String>) {
    let path = match path.map(Path::to_path_buf).or_else(default_path) {
        Some(path) => path,
        None => return (Settings::default(), None),
    };

    match load_from_path(&path) {
        Ok(settings) => (settings, None),
        Err(err) => (Settings::default(), Some(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_from_path(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.limits.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.service.field_name, "file");
        assert_eq!(settings.service.mode, RequestMode::Multipart);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[service]\nendpoint = \"https://grade.example.com/upload\"\nmode = \"url-reference\"\napi_key = \"secret\"\n\n[general]\ntheme = \"light\""
        )
        .unwrap();

        let settings = load_from_path(&path).unwrap();
        assert_eq!(settings.service.endpoint, "https://grade.example.com/upload");
        assert_eq!(settings.service.mode, RequestMode::UrlReference);
        assert_eq!(settings.service.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.service.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(settings.service.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
        assert_eq!(settings.general.theme, ThemeChoice::Light);
        assert_eq!(settings.limits, LimitsConfig::default());
    }

    #[test]
    fn test_broken_file_falls_back_with_warning() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[service\nendpoint = ").unwrap();

        let (settings, warning) = load(Some(&path));
        assert_eq!(settings, Settings::default());
        assert!(warning.unwrap().contains("Invalid settings"));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[service]\nendpoint = \"ftp://example.com/up\"").unwrap();

        assert!(matches!(load_from_path(&path), Err(ConfigError::Endpoint(_))));
    }

    #[test]
    fn test_request_mode_from_str() {
        assert_eq!("multipart".parse::<RequestMode>(), Ok(RequestMode::Multipart));
        assert_eq!("url-reference".parse::<RequestMode>(), Ok(RequestMode::UrlReference));
        assert!("carrier-pigeon".parse::<RequestMode>().is_err());
    }
}
