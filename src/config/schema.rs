use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed model identifier used for every task, matching the original deploy.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default remote-debugging endpoint probed before launching our own Chrome.
pub const DEFAULT_CDP_URL: &str = "http://localhost:9222";

fn default_api_port() -> u16 {
    8741
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    0.0
}

fn default_max_retries() -> u32 {
    2
}

fn default_max_steps() -> u32 {
    100
}

fn default_cdp_url() -> String {
    DEFAULT_CDP_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Chrome executable path
    pub chrome_path: PathBuf,

    /// Chrome user-data root; profiles are its subdirectories
    pub user_data_dir: PathBuf,

    /// Remote-debugging endpoint to probe for an already-running Chrome
    #[serde(default = "default_cdp_url")]
    pub cdp_url: String,

    /// Local chat API port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// LLM settings
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chrome_path: Self::default_chrome_path(),
            user_data_dir: crate::profiles::default_user_data_dir(),
            cdp_url: default_cdp_url(),
            api_port: default_api_port(),
            llm: LlmSettings::default(),
        }
    }
}

impl Settings {
    /// Get default Chrome path based on platform
    pub fn default_chrome_path() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            PathBuf::from("C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe")
        }
        #[cfg(target_os = "macos")]
        {
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome")
        }
        #[cfg(target_os = "linux")]
        {
            PathBuf::from("/usr/bin/google-chrome")
        }
    }
}

/// LLM client settings. The credential itself never lives in the settings
/// file; it is read from the environment at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Model identifier sent to the API
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature (deterministic by default)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Bounded retry count for transient API failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum agent actions per task
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            max_steps: default_max_steps(),
        }
    }
}
