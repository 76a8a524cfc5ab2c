//! Chrome profile discovery.
//!
//! Profiles are just subdirectories of the user-data root. The listing is a
//! best-effort convenience for the profile selector, never an authoritative
//! source; any enumeration failure degrades to `["Default"]`.

use std::path::{Path, PathBuf};
use std::sync::Once;

pub const DEFAULT_PROFILE: &str = "Default";

static LIST_FAILURE_LOGGED: Once = Once::new();

/// Platform-default Chrome user-data root.
pub fn default_user_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join("Google")
            .join("Chrome")
            .join("User Data")
    }
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Library/Application Support/Google/Chrome")
    }
    #[cfg(target_os = "linux")]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/google-chrome")
    }
}

/// List profile directory names under `user_data_dir`, sorted.
///
/// Falls back to `["Default"]` on any read failure. The failure is logged at
/// warn level once per process so a misconfigured root stays diagnosable
/// without spamming every turn.
pub fn list_profiles(user_data_dir: &Path) -> Vec<String> {
    match try_list_profiles(user_data_dir) {
        Ok(profiles) if !profiles.is_empty() => profiles,
        Ok(_) => vec![DEFAULT_PROFILE.to_string()],
        Err(e) => {
            LIST_FAILURE_LOGGED.call_once(|| {
                tracing::warn!(
                    "Could not list Chrome profiles under {:?}: {}. Falling back to [\"{}\"]",
                    user_data_dir,
                    e,
                    DEFAULT_PROFILE
                );
            });
            vec![DEFAULT_PROFILE.to_string()]
        }
    }
}

fn try_list_profiles(user_data_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut profiles = Vec::new();
    for entry in std::fs::read_dir(user_data_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            profiles.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    profiles.sort();
    Ok(profiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_profiles_sorted() {
        let root = tempfile::tempdir().unwrap();
        for name in ["Default", "Work", "Alpha"] {
            std::fs::create_dir(root.path().join(name)).unwrap();
        }
        // Stray files are not profiles
        std::fs::write(root.path().join("Local State"), "{}").unwrap();

        let profiles = list_profiles(root.path());
        assert_eq!(profiles, vec!["Alpha", "Default", "Work"]);
    }

    #[test]
    fn test_list_profiles_missing_dir_falls_back() {
        let profiles = list_profiles(Path::new("/nonexistent/chrome/user-data"));
        assert_eq!(profiles, vec![DEFAULT_PROFILE.to_string()]);
    }

    #[test]
    fn test_list_profiles_empty_dir_falls_back() {
        let root = tempfile::tempdir().unwrap();
        let profiles = list_profiles(root.path());
        assert_eq!(profiles, vec![DEFAULT_PROFILE.to_string()]);
    }
}
