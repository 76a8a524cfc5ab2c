use crate::config::schema::Settings;
use crate::error::{Result, WebpilotError};
use std::fs;
use std::path::PathBuf;

/// Get the settings file path based on platform
pub fn get_config_path() -> PathBuf {
    let config_dir = if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|p| p.join("com.webpilot.app"))
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        dirs::config_dir()
            .map(|p| p.join("webpilot"))
            .unwrap_or_else(|| PathBuf::from("."))
    };

    config_dir.join("config.toml")
}

/// Load settings from file, creating defaults if not exists
pub fn load_settings() -> Result<Settings> {
    let config_path = get_config_path();

    if !config_path.exists() {
        tracing::info!(
            "Settings file not found at {:?}, creating default",
            config_path
        );
        return init_settings();
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        WebpilotError::Config(format!(
            "Failed to read settings from {:?}: {}",
            config_path, e
        ))
    })?;

    let settings: Settings = toml::from_str(&content)?;

    tracing::info!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

/// Save settings to file
pub fn save_settings(settings: &Settings) -> Result<()> {
    let config_path = get_config_path();

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            WebpilotError::Config(format!(
                "Failed to create config directory {:?}: {}",
                parent, e
            ))
        })?;
    }

    let content = toml::to_string_pretty(settings)?;

    fs::write(&config_path, content).map_err(|e| {
        WebpilotError::Config(format!(
            "Failed to write settings to {:?}: {}",
            config_path, e
        ))
    })?;

    tracing::info!("Saved settings to {:?}", config_path);
    Ok(())
}

/// Initialize default settings and save to file
pub fn init_settings() -> Result<Settings> {
    let settings = Settings::default();
    save_settings(&settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path() {
        let path = get_config_path();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = Settings::default();
        let content = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&content).unwrap();
        assert_eq!(parsed.api_port, settings.api_port);
        assert_eq!(parsed.llm.model, settings.llm.model);
    }
}
