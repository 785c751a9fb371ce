use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read config file {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file {}: {source}", .path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid api base url {url:?}: {source}")]
    InvalidUrl { url: String, source: url::ParseError },
    #[error("api base url {0:?} must use http or https")]
    UnsupportedScheme(String),
}

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FileSettings {
    pub api_base_url: Option<String>,
    pub log_filter: Option<String>,
    pub fallback_replies: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overrides {
    pub api_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub api_base_url: Url,
    pub log_filter: String,
    pub fallback_replies: Option<Vec<String>>,
}

impl FileSettings {
    /// Loads an explicit path (must exist) or the default location (may be absent).
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::read(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("slotbot").join("config.json"))
}

/// Command line beats environment (folded into `overrides` by clap), which
/// beats the config file, which beats the built-in default.
pub fn resolve_effective_settings(file: &FileSettings, overrides: &Overrides) -> Result<EffectiveSettings, SettingsError> {
    let raw = overrides
        .api_base_url
        .clone()
        .or_else(|| file.api_base_url.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let api_base_url = parse_base_url(&raw)?;

    let log_filter = file
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(EffectiveSettings {
        api_base_url,
        log_filter,
        fallback_replies: file.fallback_replies.clone(),
    })
}

fn parse_base_url(raw: &str) -> Result<Url, SettingsError> {
    let url = Url::parse(raw.trim()).map_err(|source| SettingsError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SettingsError::UnsupportedScheme(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn precedence_override_over_file_over_default() {
        let file = FileSettings {
            api_base_url: Some("http://file-host:9000".into()),
            log_filter: Some("slotbot=debug".into()),
            fallback_replies: None,
        };
        let overrides = Overrides { api_base_url: Some("https://cli-host/api".into()) };

        let eff = resolve_effective_settings(&file, &overrides).unwrap();
        assert_eq!(eff.api_base_url.as_str(), "https://cli-host/api");
        assert_eq!(eff.log_filter, "slotbot=debug"); // from file

        let eff = resolve_effective_settings(&file, &Overrides::default()).unwrap();
        assert_eq!(eff.api_base_url.as_str(), "http://file-host:9000/");

        let eff = resolve_effective_settings(&FileSettings::default(), &Overrides::default()).unwrap();
        assert_eq!(eff.api_base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(eff.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        let bad = Overrides { api_base_url: Some("not a url".into()) };
        assert!(matches!(
            resolve_effective_settings(&FileSettings::default(), &bad),
            Err(SettingsError::InvalidUrl { .. })
        ));
        let ftp = Overrides { api_base_url: Some("ftp://example.com".into()) };
        assert!(matches!(
            resolve_effective_settings(&FileSettings::default(), &ftp),
            Err(SettingsError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_base_url": "http://10.0.0.5:8000", "fallback_replies": ["Please try again later."]}"#,
        )
        .unwrap();
        let file = FileSettings::load(Some(&path)).unwrap();
        assert_eq!(file.api_base_url.as_deref(), Some("http://10.0.0.5:8000"));
        assert_eq!(file.log_filter, None);
        assert_eq!(file.fallback_replies.unwrap(), ["Please try again later."]);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = FileSettings::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ api_base_url: ").unwrap();
        assert!(matches!(FileSettings::load(Some(&path)), Err(SettingsError::Parse { .. })));
    }
}
