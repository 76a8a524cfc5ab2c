use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed window and viewport size for launched browsers.
pub const WINDOW_WIDTH: u32 = 1920;
pub const WINDOW_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
        }
    }
}

/// How to obtain a controllable browser for one task. Constructed fresh per
/// task invocation and discarded afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ConnectConfig {
    /// Attach to an already-running Chrome reachable at this debug URL.
    Attach { cdp_url: String },
    /// Launch a new Chrome process bound to a profile.
    Launch(LaunchConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Chrome executable path
    pub chrome_path: PathBuf,
    /// User-data root passed as --user-data-dir
    pub user_data_dir: PathBuf,
    /// Profile subdirectory passed as --profile-directory
    pub profile_directory: String,
    /// Window size passed as --window-size
    #[serde(default)]
    pub window: WindowSize,
    /// Matching logical viewport applied to the page after connect
    #[serde(default)]
    pub viewport: WindowSize,
}

impl LaunchConfig {
    /// Browser command-line flags, excluding the debug port (allocated at
    /// launch time by the CDP client).
    pub fn browser_args(&self) -> Vec<String> {
        vec![
            format!("--user-data-dir={}", self.user_data_dir.display()),
            format!("--profile-directory={}", self.profile_directory),
            format!("--window-size={},{}", self.window.width, self.window.height),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_args_embed_profile_and_user_data_dir() {
        let config = LaunchConfig {
            chrome_path: PathBuf::from("/usr/bin/google-chrome"),
            user_data_dir: PathBuf::from("/home/u/.config/google-chrome"),
            profile_directory: "Profile 2".to_string(),
            window: WindowSize::default(),
            viewport: WindowSize::default(),
        };
        let args = config.browser_args();
        assert!(args.contains(&"--user-data-dir=/home/u/.config/google-chrome".to_string()));
        assert!(args.contains(&"--profile-directory=Profile 2".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
    }
}
