//! Probe-then-fallback connection choice.
//!
//! An HTTP 200 from `<cdp_url>/json/version` within the probe timeout is
//! taken as proof a controllable Chrome is already listening; every other
//! outcome (refused, timeout, non-200) means launch mode. The probe is
//! re-run on every task so an external Chrome can come and go between turns.

use crate::browser::config::{ConnectConfig, LaunchConfig, WindowSize};
use crate::config::Settings;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Choose how to reach a browser for one task with the given profile.
pub async fn choose_connect_config(settings: &Settings, profile: &str) -> ConnectConfig {
    if cdp_available(&settings.cdp_url).await {
        tracing::info!("Attaching to running Chrome at {}", settings.cdp_url);
        return ConnectConfig::Attach {
            cdp_url: settings.cdp_url.clone(),
        };
    }

    tracing::info!(
        "No Chrome listening at {}, will launch profile {:?}",
        settings.cdp_url,
        profile
    );
    ConnectConfig::Launch(LaunchConfig {
        chrome_path: settings.chrome_path.clone(),
        user_data_dir: settings.user_data_dir.clone(),
        profile_directory: profile.to_string(),
        window: WindowSize::default(),
        viewport: WindowSize::default(),
    })
}

/// Probe the debug endpoint. Any failure is treated the same.
async fn cdp_available(cdp_url: &str) -> bool {
    let url = format!("{}/json/version", cdp_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.get(&url).send().await {
        Ok(resp) => resp.status() == reqwest::StatusCode::OK,
        Err(e) => {
            tracing::debug!("CDP probe failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_settings(cdp_url: String) -> Settings {
        Settings {
            chrome_path: PathBuf::from("/usr/bin/google-chrome"),
            user_data_dir: PathBuf::from("/tmp/chrome-user-data"),
            cdp_url,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_chooses_launch() {
        // Reserve a port, then drop the listener so the probe gets refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let settings = test_settings(format!("http://127.0.0.1:{}", port));
        let config = choose_connect_config(&settings, "Work").await;
        match config {
            ConnectConfig::Launch(launch) => {
                assert_eq!(launch.profile_directory, "Work");
                assert_eq!(launch.user_data_dir, PathBuf::from("/tmp/chrome-user-data"));
                let args = launch.browser_args();
                assert!(args.contains(&"--profile-directory=Work".to_string()));
                assert!(args.contains(&"--user-data-dir=/tmp/chrome-user-data".to_string()));
            }
            other => panic!("expected launch config, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reachable_endpoint_chooses_attach() {
        use axum::{routing::get, Router};

        let app = Router::new().route(
            "/json/version",
            get(|| async { axum::Json(serde_json::json!({"Browser": "Chrome/120.0"})) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let cdp_url = format!("http://127.0.0.1:{}", addr.port());
        let settings = test_settings(cdp_url.clone());

        // Profile choice must not affect attach mode.
        for profile in ["Default", "Alpha"] {
            let config = choose_connect_config(&settings, profile).await;
            assert_eq!(
                config,
                ConnectConfig::Attach {
                    cdp_url: cdp_url.clone()
                }
            );
        }
    }
}
