use crate::agent::types::{AgentAction, Decision, LlmMessage, LlmResponse};
use crate::browser::cdp::DomContext;
use crate::config::LlmSettings;
use crate::error::{Result, WebpilotError};
use async_trait::async_trait;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// LLM provider seam. One implementation today; the trait keeps the engine
/// independent of the wire format.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request
    async fn complete(&self, messages: &[LlmMessage]) -> Result<LlmResponse>;

    /// Get model name
    fn model(&self) -> &str;
}

/// Gemini `generateContent` provider with deterministic sampling and a small
/// bounded retry count for transient failures.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    max_retries: u32,
}

impl GeminiProvider {
    pub fn new(api_key: String, settings: &LlmSettings) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_retries: settings.max_retries,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn build_body(&self, messages: &[LlmMessage]) -> serde_json::Value {
        let mut system_parts: Vec<serde_json::Value> = Vec::new();
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for msg in messages {
            match msg.role.as_str() {
                "system" => {
                    system_parts.push(serde_json::json!({ "text": msg.content }));
                }
                role => {
                    // Gemini names the assistant side "model"
                    let gemini_role = if role == "assistant" { "model" } else { "user" };
                    contents.push(serde_json::json!({
                        "role": gemini_role,
                        "parts": [{ "text": msg.content }]
                    }));
                }
            }
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": { "temperature": self.temperature }
        });
        if !system_parts.is_empty() {
            body["systemInstruction"] = serde_json::json!({ "parts": system_parts });
        }
        body
    }

    async fn request_once(&self, body: &serde_json::Value) -> Result<LlmResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| WebpilotError::Llm(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(WebpilotError::Llm(format!(
                "Gemini API error (HTTP {}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WebpilotError::Llm(format!("Failed to parse response: {}", e)))?;

        let content = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, messages: &[LlmMessage]) -> Result<LlmResponse> {
        let body = self.build_body(messages);

        let mut last_err: Option<WebpilotError> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(500 * attempt as u64)).await;
                tracing::debug!("Retrying LLM call (attempt {})", attempt + 1);
            }
            match self.request_once(&body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !is_transient(&e) {
                        return Err(e);
                    }
                    tracing::warn!("Transient LLM failure: {}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| WebpilotError::Llm("LLM retries exhausted".to_string())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Connection-level failures and throttling/server statuses are worth the
/// bounded retry; anything else (4xx, malformed response) is not.
fn is_transient(err: &WebpilotError) -> bool {
    let text = err.to_string();
    if text.contains("Request failed") {
        return true;
    }
    for status in [429u16, 500, 502, 503, 504] {
        if text.contains(&format!("HTTP {}", status)) {
            return true;
        }
    }
    false
}

/// Parse LLM decision from response content.
pub fn parse_decision(content: &str) -> Result<Decision> {
    // Try to extract JSON from the response
    let json_start = content.find('{');
    let json_end = content.rfind('}');

    if let (Some(start), Some(end)) = (json_start, json_end) {
        let json_str = &content[start..=end];
        if let Ok(decision) = serde_json::from_str::<Decision>(json_str) {
            return Ok(decision);
        }
    }

    // Fallback for models that don't output clean JSON: infer from text
    let action = if content.contains("navigate") || content.contains("go to") {
        let url = extract_url(content).unwrap_or_else(|| "about:blank".to_string());
        AgentAction::Navigate { url }
    } else if content.contains("click") {
        AgentAction::Click {
            selector: "button".to_string(),
        }
    } else if content.contains("type") || content.contains("enter") {
        AgentAction::Type {
            selector: "input".to_string(),
            text: String::new(),
        }
    } else {
        AgentAction::None
    };

    Ok(Decision {
        action,
        reasoning: content.to_string(),
        is_complete: content.contains("complete")
            || content.contains("done")
            || content.contains("finished"),
        result: None,
    })
}

/// Extract URL from text
fn extract_url(text: &str) -> Option<String> {
    for word in text.split_whitespace() {
        if word.starts_with("http://") || word.starts_with("https://") {
            return Some(
                word.trim_matches(|c: char| {
                    !c.is_alphanumeric() && c != ':' && c != '/' && c != '.' && c != '-'
                })
                .to_string(),
            );
        }
    }
    None
}

/// Build system prompt for the agent
pub fn build_system_prompt() -> String {
    r##"You are a browser automation agent. Your task is to help users perform actions in a web browser.

You will receive information about the current page state (URL, title, interactive elements).

You must respond with a JSON object containing:
- action: The action to take (see below)
- reasoning: Why you chose this action
- is_complete: Whether the task is complete
- result: (optional) Any data to extract if task is complete

Available actions:
1. Navigate to URL: {"type": "navigate", "url": "https://example.com"}
2. Click element: {"type": "click", "selector": "#button-id"}
3. Type text: {"type": "type", "selector": "#input-id", "text": "hello"}
4. Press key: {"type": "press_key", "key": "Enter"}
5. Scroll page: {"type": "scroll", "direction": "down", "amount": 300}
6. Wait: {"type": "wait", "duration_ms": 1000}
7. Extract data: {"type": "extract", "selectors": {"name": "#name"}}
8. Go back: {"type": "go_back"}
9. No action: {"type": "none"}

Selectors should use CSS selectors (e.g., #id, .class, tag, [attr=value]).

Be concise and focused. Complete the task efficiently. If the task is done, set is_complete to true."##
        .to_string()
}

/// Build user prompt with page context
pub fn build_context_prompt(task: &str, dom_context: &DomContext) -> String {
    let elements_str = dom_context
        .elements
        .iter()
        .take(50) // Limit elements to avoid token limits
        .map(|el| {
            let mut parts = vec![format!("- {}", el.selector)];
            if let Some(text) = &el.text {
                if !text.is_empty() && text.len() < 100 {
                    parts.push(format!("  text: \"{}\"", text));
                }
            }
            if let Some(placeholder) = &el.placeholder {
                parts.push(format!("  placeholder: \"{}\"", placeholder));
            }
            if let Some(aria_label) = &el.aria_label {
                parts.push(format!("  aria-label: \"{}\"", aria_label));
            }
            parts.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Task: {}

Current page:
- URL: {}
- Title: {}

Interactive elements:
{}

What action should I take next? Respond with JSON only."#,
        task,
        dom_context.url,
        dom_context.title.as_deref().unwrap_or("N/A"),
        elements_str
    )
}
