pub mod agent;
pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod executor;
pub mod profiles;
pub mod session;
pub mod state;

use crate::config::EnvOverrides;
use crate::error::Result;
use crate::state::AppState;

/// Start the service: resolve the environment (fail fast on a missing
/// credential, before anything is served), load settings, and run the chat
/// API until shutdown.
pub async fn run() -> Result<()> {
    // Best-effort .env load; absence is fine
    let _ = dotenvy::dotenv();

    let env = EnvOverrides::resolve()?;

    // Settings file is optional; load failure degrades to defaults without
    // overwriting the file on disk
    let mut settings = match config::load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(
                "Failed to load settings: {}. Using in-memory defaults (not saving).",
                e
            );
            config::Settings::default()
        }
    };
    env.apply(&mut settings);

    tracing::info!(
        "Chrome: {:?}, user data: {:?}, CDP probe: {}",
        settings.chrome_path,
        settings.user_data_dir,
        settings.cdp_url
    );

    let port = settings.api_port;
    let state = AppState::new(settings, env.api_key);
    api::run_server(state, port).await
}
