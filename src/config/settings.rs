use crate::constants::DEFAULT_SCAN_INTERVAL_SECS;
use crate::error::AppError;
use crate::validation::{validate_presence_endpoint, validate_scan_interval};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Daemon settings, read from `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan_interval_secs: u64,
    pub presence_endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            presence_endpoint: None,
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults for anything missing or invalid.
    pub fn load(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str::<Self>(&contents).unwrap_or_else(|e| {
                warn!("Ignoring unparseable settings in {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        };

        if let Err(e) = validate_scan_interval(settings.scan_interval_secs) {
            warn!("{e}; using {DEFAULT_SCAN_INTERVAL_SECS}s");
            settings.scan_interval_secs = DEFAULT_SCAN_INTERVAL_SECS;
        }
        if let Some(endpoint) = settings.presence_endpoint.as_deref() {
            if endpoint.trim().is_empty() {
                settings.presence_endpoint = None;
            } else if let Err(e) = validate_presence_endpoint(endpoint) {
                warn!("{e}; presence stream disabled");
                settings.presence_endpoint = None;
            }
        }
        settings
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

/// Twitch credentials produced by the external OAuth flow.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default)]
    pub user_login: String,
    pub broadcaster_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("user_login", &self.user_login)
            .field("broadcaster_id", &self.broadcaster_id)
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read credentials {}: {e}", path.display()))
        })?;
        let creds: Self = serde_json::from_str(&contents)?;
        if creds.access_token.trim().is_empty() || creds.broadcaster_id.trim().is_empty() {
            return Err(AppError::Config(
                "credentials must contain access_token and broadcaster_id".into(),
            ));
        }
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_settings_are_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.scan_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"scan_interval_secs": 10}"#).unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.scan_interval_secs, 10);
        assert!(settings.presence_endpoint.is_none());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"scan_interval_secs": 0, "presence_endpoint": "https://example.com/x"}"#,
        )
        .unwrap();

        let settings = Settings::load(&path);
        assert_eq!(settings.scan_interval_secs, DEFAULT_SCAN_INTERVAL_SECS);
        assert!(settings.presence_endpoint.is_none());
    }

    #[test]
    fn test_valid_presence_endpoint_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            presence_endpoint: Some(
                "https://nxapi-presence.fancy.org.uk/api/presence/abc/events".into(),
            ),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_credentials_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(
            &path,
            r#"{"access_token":"tok","user_login":"me","broadcaster_id":"42"}"#,
        )
        .unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.broadcaster_id, "42");
        assert!(!format!("{creds:?}").contains("tok"));
    }

    #[test]
    fn test_credentials_missing_or_incomplete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        assert!(Credentials::load(&path).is_err());

        fs::write(&path, r#"{"access_token":"","broadcaster_id":"42"}"#).unwrap();
        assert!(Credentials::load(&path).is_err());
    }
}
