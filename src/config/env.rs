//! Startup environment resolution.
//!
//! The LLM credential is required and checked exactly once, before any UI is
//! served; the remaining variables are optional overrides applied on top of
//! the settings file.

use crate::config::schema::Settings;
use crate::error::{Result, WebpilotError};
use std::path::PathBuf;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const USER_DATA_DIR_VAR: &str = "CHROME_USER_DATA_DIR";
pub const CDP_URL_VAR: &str = "CDP_URL";
pub const CHROME_BINARY_VAR: &str = "CHROME_BINARY_PATH";

/// Values resolved from the process environment at startup.
#[derive(Debug, Clone)]
pub struct EnvOverrides {
    /// LLM API credential (required)
    pub api_key: String,
    pub user_data_dir: Option<PathBuf>,
    pub cdp_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
}

impl EnvOverrides {
    /// Resolve from the real process environment.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve through an injected lookup, so tests never mutate process env.
    pub fn resolve_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                WebpilotError::Config(format!(
                    "{} is not set. Export it before starting webpilot.",
                    API_KEY_VAR
                ))
            })?;

        // An override pointing at a nonexistent directory is ignored, same
        // as the platform-default fallback path not existing yet.
        let user_data_dir = lookup(USER_DATA_DIR_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .filter(|p| p.is_dir());

        let cdp_url = lookup(CDP_URL_VAR).filter(|v| !v.is_empty());

        let chrome_path = lookup(CHROME_BINARY_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_key,
            user_data_dir,
            cdp_url,
            chrome_path,
        })
    }

    /// Apply environment overrides on top of file-based settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.user_data_dir {
            settings.user_data_dir = dir.clone();
        }
        if let Some(url) = &self.cdp_url {
            settings.cdp_url = url.clone();
        }
        if let Some(path) = &self.chrome_path {
            settings.chrome_path = path.clone();
        }
    }
}
