use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One message in the LLM conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Raw completion returned by a provider
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
}

/// LLM action decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Action to take
    pub action: AgentAction,
    /// Reasoning for this action
    pub reasoning: String,
    /// Whether task is complete
    pub is_complete: bool,
    /// Result to extract (if complete)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Actions the agent can take
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    /// Navigate to a URL
    Navigate { url: String },
    /// Click an element
    Click { selector: String },
    /// Type text into an element
    Type { selector: String, text: String },
    /// Press a key
    PressKey { key: String },
    /// Scroll the page
    Scroll {
        direction: ScrollDirection,
        amount: u32,
    },
    /// Wait for an element or time
    Wait {
        duration_ms: Option<u64>,
        selector: Option<String>,
    },
    /// Extract data from the page
    Extract { selectors: HashMap<String, String> },
    /// Go back in history
    GoBack,
    /// No action needed (task complete or waiting)
    None,
}

impl AgentAction {
    /// Short human-readable form used in run-log lines.
    pub fn describe(&self) -> String {
        match self {
            AgentAction::Navigate { url } => format!("navigate to {}", url),
            AgentAction::Click { selector } => format!("click {}", selector),
            AgentAction::Type { selector, text } => {
                format!("type {:?} into {}", text, selector)
            }
            AgentAction::PressKey { key } => format!("press {}", key),
            AgentAction::Scroll { direction, amount } => {
                format!("scroll {:?} by {}", direction, amount)
            }
            AgentAction::Wait {
                duration_ms,
                selector,
            } => match (duration_ms, selector) {
                (Some(ms), _) => format!("wait {} ms", ms),
                (None, Some(sel)) => format!("wait for {}", sel),
                _ => "wait".to_string(),
            },
            AgentAction::Extract { selectors } => {
                format!("extract {} field(s)", selectors.len())
            }
            AgentAction::GoBack => "go back".to_string(),
            AgentAction::None => "no action".to_string(),
        }
    }
}

/// Scroll direction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Outcome of executing one action
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_deserializes_from_tagged_json() {
        let action: AgentAction =
            serde_json::from_str(r#"{"type": "navigate", "url": "https://example.com"}"#).unwrap();
        assert!(matches!(action, AgentAction::Navigate { ref url } if url == "https://example.com"));

        let action: AgentAction =
            serde_json::from_str(r#"{"type": "press_key", "key": "Enter"}"#).unwrap();
        assert!(matches!(action, AgentAction::PressKey { ref key } if key == "Enter"));
    }

    #[test]
    fn test_describe() {
        let action = AgentAction::Click {
            selector: "#submit".to_string(),
        };
        assert_eq!(action.describe(), "click #submit");
        assert_eq!(AgentAction::None.describe(), "no action");
    }
}
