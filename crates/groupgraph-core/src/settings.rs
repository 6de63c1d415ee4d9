//! Local settings file (`settings.json`).
//!
//! Holds the GroupMe API base URL and the access token. The file is created
//! with placeholder values on first use; the operator has to fill in the token
//! before any sync can run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GgResult, GroupGraphError};

/// Default file name, resolved against the working directory by the CLI.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Public GroupMe API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groupme.com/v3";

/// Value written into a freshly created settings file.
pub const TOKEN_PLACEHOLDER: &str = "your API token here (get one here: https://dev.groupme.com/)";

/// Connection settings for the GroupMe API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub group_me_api: String,
    #[serde(default)]
    pub access_token: String,
}

impl Settings {
    /// Build settings from explicit values, validating the token.
    pub fn new(group_me_api: &str, access_token: &str) -> GgResult<Self> {
        let mut settings = Self::placeholder();
        if !group_me_api.trim().is_empty() {
            settings.group_me_api = group_me_api.trim().trim_end_matches('/').to_string();
        }
        settings.set_access_token(access_token)?;
        Ok(settings)
    }

    /// Settings as written on first run.
    pub fn placeholder() -> Self {
        Self {
            group_me_api: DEFAULT_API_URL.to_string(),
            access_token: TOKEN_PLACEHOLDER.to_string(),
        }
    }

    /// Replace the access token; it must be lowercase hexadecimal.
    pub fn set_access_token(&mut self, token: &str) -> GgResult<()> {
        self.access_token = validate_token(token)?;
        Ok(())
    }

    /// Load settings from `path`.
    ///
    /// A missing file is created with placeholder values and reported as a
    /// configuration error telling the operator where to put the token.
    pub fn load(path: &Path) -> GgResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Self::placeholder().save(path)?;
                info!(path = %path.display(), "Created settings file");
                return Err(GroupGraphError::config(format!(
                    "new settings file created at {}, the access token needs to be configured",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut settings: Settings = serde_json::from_str(&contents).map_err(|e| {
            GroupGraphError::config(format!("settings file {} is invalid: {}", path.display(), e))
        })?;

        if settings.access_token.is_empty() && settings.group_me_api.is_empty() {
            return Err(GroupGraphError::config(format!(
                "settings file {} is empty",
                path.display()
            )));
        }
        if settings.access_token == TOKEN_PLACEHOLDER {
            return Err(GroupGraphError::config(format!(
                "access token needs to be configured at {}",
                path.display()
            )));
        }

        settings.access_token = validate_token(&settings.access_token).map_err(|e| {
            GroupGraphError::config(format!("{} (in {})", e, path.display()))
        })?;
        if settings.group_me_api.is_empty() {
            settings.group_me_api = DEFAULT_API_URL.to_string();
        }

        Ok(settings)
    }

    /// Write settings to `path` as pretty JSON.
    pub fn save(&self, path: &Path) -> GgResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// The token with everything but the last four characters hidden.
    pub fn masked_token(&self) -> String {
        let visible = self.access_token.len().saturating_sub(4);
        let tail = self.access_token.get(visible..).unwrap_or("");
        format!("{}{}", "*".repeat(visible), tail)
    }
}

fn validate_token(token: &str) -> GgResult<String> {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
        return Err(GroupGraphError::config(
            "access token is invalid (is not a hexadecimal number, all lowercase)",
        ));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_validates_token() {
        let settings = Settings::new(DEFAULT_API_URL, "0123456789abcdef").unwrap();
        assert_eq!(settings.access_token, "0123456789abcdef");

        assert!(Settings::new(DEFAULT_API_URL, "").is_err());
        assert!(Settings::new(DEFAULT_API_URL, "ABCDEF").is_err());
        assert!(Settings::new(DEFAULT_API_URL, "not-a-token").is_err());
    }

    #[test]
    fn test_new_defaults_and_trims_api_url() {
        let settings = Settings::new("", "abc123").unwrap();
        assert_eq!(settings.group_me_api, DEFAULT_API_URL);

        let settings = Settings::new("http://localhost:8080/v3/", "abc123").unwrap();
        assert_eq!(settings.group_me_api, "http://localhost:8080/v3");
    }

    #[test]
    fn test_first_load_creates_placeholder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, GroupGraphError::Config(_)));
        assert!(err.to_string().contains("new settings file created"));
        assert!(path.exists());

        // Placeholder still in place on the second run.
        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("access token needs to be configured"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings::new(DEFAULT_API_URL, "deadbeef").unwrap();
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_load_empty_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"group_me_api": "", "access_token": ""}"#).unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_load_rejects_bad_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"group_me_api": "", "access_token": "XYZ"}"#).unwrap();

        assert!(matches!(Settings::load(&path), Err(GroupGraphError::Config(_))));
    }

    #[test]
    fn test_masked_token() {
        let settings = Settings::new(DEFAULT_API_URL, "0123456789abcdef").unwrap();
        assert_eq!(settings.masked_token(), "************cdef");
        let short = Settings::new(DEFAULT_API_URL, "ab").unwrap();
        assert_eq!(short.masked_token(), "ab");
    }
}
