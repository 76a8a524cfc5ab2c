use crate::config::Settings;
use crate::session::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application global state. Settings are resolved once at startup and
/// immutable afterward; only the session store mutates.
pub struct AppState {
    pub settings: Settings,
    /// LLM credential, resolved from the environment at startup
    pub api_key: String,
    pub sessions: SessionStore,
    /// Serializes chat turns: one task runs at a time, matching the
    /// one-submission-blocks-the-UI model.
    pub turn_lock: Mutex<()>,
}

impl AppState {
    pub fn new(settings: Settings, api_key: String) -> Arc<Self> {
        Arc::new(Self {
            settings,
            api_key,
            sessions: SessionStore::new(),
            turn_lock: Mutex::new(()),
        })
    }
}
