//! One task, end to end.
//!
//! Probe-or-launch, connect, run the agent, close: each step awaited in
//! sequence, nothing cached across turns. The browser handle is closed on
//! every exit path before the run result is propagated.

use crate::agent::{Agent, GeminiProvider, RunLog};
use crate::browser::{choose_connect_config, CdpClient};
use crate::config::Settings;
use crate::error::Result;

/// How many trailing run-log lines make up the per-turn summary.
const SUMMARY_LINES: usize = 4;

/// Execute one natural-language browser task against the chosen profile and
/// return the tail of the run log as a summary.
pub async fn execute_task(
    settings: &Settings,
    api_key: &str,
    task: &str,
    profile: &str,
) -> Result<String> {
    let connect_config = choose_connect_config(settings, profile).await;
    let mut browser = CdpClient::connect(&connect_config).await?;

    let result = run_agent(settings, api_key, task, &browser).await;

    // Close on every exit path; a close failure is logged, never masks the
    // run result.
    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser cleanly: {}", e);
    }

    let log = result?;
    Ok(log.tail(SUMMARY_LINES))
}

async fn run_agent(
    settings: &Settings,
    api_key: &str,
    task: &str,
    browser: &CdpClient,
) -> Result<RunLog> {
    let provider = Box::new(GeminiProvider::new(api_key.to_string(), &settings.llm));
    let agent = Agent::new(task, provider, browser);
    agent.run(settings.llm.max_steps).await
}
