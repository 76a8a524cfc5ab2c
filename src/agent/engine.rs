use crate::agent::action::execute_action;
use crate::agent::llm::{build_context_prompt, build_system_prompt, parse_decision, LlmProvider};
use crate::agent::log::RunLog;
use crate::agent::types::LlmMessage;
use crate::browser::CdpClient;
use crate::error::{Result, WebpilotError};

/// Maximum consecutive failures before aborting the run
const MAX_FAILURES: u32 = 3;

/// Maximum messages to keep in history (to avoid token limits)
const MAX_MESSAGES: usize = 30;

/// Delay between steps
const STEP_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Trim message history to keep it within limits, always preserving the
/// system message.
fn trim_messages(messages: &mut Vec<LlmMessage>) {
    if messages.len() <= MAX_MESSAGES {
        return;
    }

    let system_msg = messages.first().filter(|m| m.role == "system").cloned();

    let keep_count = MAX_MESSAGES - 1;
    let start_idx = messages.len() - keep_count;

    let mut new_messages = Vec::with_capacity(MAX_MESSAGES);
    if let Some(system) = system_msg {
        new_messages.push(system);
    }
    new_messages.extend(messages.iter().skip(start_idx).cloned());

    *messages = new_messages;
    tracing::debug!("Trimmed message history to {} messages", messages.len());
}

/// First line of a model's reasoning, bounded, for run-log lines.
fn summarize(text: &str) -> String {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut s: String = first_line.chars().take(160).collect();
    if s.len() < first_line.len() {
        s.push('…');
    }
    s
}

/// One agent bound to one task, one LLM provider, and one connected browser.
/// Consumed by a single `run`.
pub struct Agent<'b> {
    task: String,
    provider: Box<dyn LlmProvider>,
    browser: &'b CdpClient,
}

impl<'b> Agent<'b> {
    pub fn new(task: impl Into<String>, provider: Box<dyn LlmProvider>, browser: &'b CdpClient) -> Self {
        Self {
            task: task.into(),
            provider,
            browser,
        }
    }

    /// Run the decide-then-act loop until the model declares completion or the
    /// step cap is reached. Returns the captured run log; hard failures
    /// (transport down, LLM retries exhausted, repeated bad steps) propagate
    /// as errors.
    pub async fn run(self, max_steps: u32) -> Result<RunLog> {
        let mut log = RunLog::new();
        log.push(format!("Task: {}", self.task));

        let mut messages = vec![
            LlmMessage::system(build_system_prompt()),
            LlmMessage::user(format!("My task is: {}", self.task)),
        ];

        let mut consecutive_failures = 0u32;

        for step in 1..=max_steps {
            let dom_context = match self.browser.dom_context().await {
                Ok(ctx) => ctx,
                Err(e) => {
                    consecutive_failures += 1;
                    log.push(format!("Could not read page state: {}", e));
                    if consecutive_failures >= MAX_FAILURES {
                        return Err(WebpilotError::Agent(format!(
                            "Failed to read page state {} times: {}",
                            MAX_FAILURES, e
                        )));
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            messages.push(LlmMessage::user(build_context_prompt(
                &self.task,
                &dom_context,
            )));
            trim_messages(&mut messages);

            let response = match self.provider.complete(&messages).await {
                Ok(r) => r,
                Err(e) => {
                    consecutive_failures += 1;
                    log.push(format!("Model call failed: {}", e));
                    // Remove the context message before retrying
                    messages.pop();
                    if consecutive_failures >= MAX_FAILURES {
                        return Err(e);
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    continue;
                }
            };

            messages.push(LlmMessage::assistant(response.content.clone()));
            trim_messages(&mut messages);

            let decision = match parse_decision(&response.content) {
                Ok(d) => d,
                Err(e) => {
                    consecutive_failures += 1;
                    log.push(format!("Unparseable model response: {}", e));
                    if consecutive_failures >= MAX_FAILURES {
                        return Err(WebpilotError::Agent(format!(
                            "Model produced {} unparseable responses",
                            MAX_FAILURES
                        )));
                    }
                    messages.pop();
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            consecutive_failures = 0;

            log.push(format!(
                "Step {} [{}]: {}",
                step,
                dom_context.url,
                decision.action.describe()
            ));
            if !decision.reasoning.is_empty() {
                log.push(format!("  {}", summarize(&decision.reasoning)));
            }

            if decision.is_complete {
                if let Some(result) = &decision.result {
                    log.push(format!("Extracted: {}", result));
                }
                log.push(format!("Task completed after {} step(s)", step));
                return Ok(log);
            }

            match execute_action(self.browser, &decision.action).await {
                Ok(result) => {
                    log.push(format!("  {}", result.message));
                    if let Some(data) = result.data {
                        log.push(format!("  data: {}", data));
                    }
                    if !result.success {
                        consecutive_failures += 1;
                        messages.push(LlmMessage::user(format!(
                            "The last action failed: {}. Please try a different approach.",
                            result.message
                        )));
                        trim_messages(&mut messages);
                        if consecutive_failures >= MAX_FAILURES {
                            return Err(WebpilotError::Agent(format!(
                                "{} consecutive action failures: {}",
                                MAX_FAILURES, result.message
                            )));
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    log.push(format!("  Action error: {}", e));
                    if consecutive_failures >= MAX_FAILURES {
                        return Err(e);
                    }
                }
            }

            tokio::time::sleep(STEP_DELAY).await;
        }

        log.push(format!(
            "Reached the {}-step limit before the task was declared complete",
            max_steps
        ));
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_messages_preserves_system() {
        let mut messages = vec![LlmMessage::system("system prompt")];
        for i in 0..40 {
            messages.push(LlmMessage::user(format!("message {}", i)));
        }

        trim_messages(&mut messages);

        assert_eq!(messages.len(), MAX_MESSAGES);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages.last().unwrap().content, "message 39");
    }

    #[test]
    fn test_trim_messages_noop_when_short() {
        let mut messages = vec![LlmMessage::system("s"), LlmMessage::user("u")];
        trim_messages(&mut messages);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_summarize_first_line_bounded() {
        assert_eq!(summarize("short reason\nsecond line"), "short reason");
        let long = "x".repeat(300);
        let summarized = summarize(&long);
        assert!(summarized.chars().count() <= 161);
        assert!(summarized.ends_with('…'));
    }
}
