use crate::agent::types::{ActionResult, AgentAction, ScrollDirection};
use crate::browser::CdpClient;
use crate::error::Result;

/// Execute one decided action against the page.
///
/// Element-level misses (selector not found, wait timeout) come back as an
/// unsuccessful `ActionResult` so the model can try a different approach;
/// transport-level failures propagate as errors.
pub async fn execute_action(client: &CdpClient, action: &AgentAction) -> Result<ActionResult> {
    match action {
        AgentAction::Navigate { url } => {
            client.navigate(url).await?;
            Ok(ActionResult {
                success: true,
                message: format!("Navigated to {}", url),
                data: None,
            })
        }

        AgentAction::Click { selector } => match client.click(selector).await {
            Ok(_) => Ok(ActionResult {
                success: true,
                message: format!("Clicked {}", selector),
                data: None,
            }),
            Err(e) => Ok(ActionResult {
                success: false,
                message: format!("Failed to click {}: {}", selector, e),
                data: None,
            }),
        },

        AgentAction::Type { selector, text } => match client.type_text(selector, text).await {
            Ok(_) => Ok(ActionResult {
                success: true,
                message: format!("Typed {:?} into {}", text, selector),
                data: None,
            }),
            Err(e) => Ok(ActionResult {
                success: false,
                message: format!("Failed to type into {}: {}", selector, e),
                data: None,
            }),
        },

        AgentAction::PressKey { key } => match client.press_key(key).await {
            Ok(_) => Ok(ActionResult {
                success: true,
                message: format!("Pressed key {}", key),
                data: None,
            }),
            Err(e) => Ok(ActionResult {
                success: false,
                message: format!("Failed to press key {}: {}", key, e),
                data: None,
            }),
        },

        AgentAction::Scroll { direction, amount } => {
            let dir_str = match direction {
                ScrollDirection::Up => "up",
                ScrollDirection::Down => "down",
                ScrollDirection::Left => "left",
                ScrollDirection::Right => "right",
            };
            client.scroll(dir_str, *amount).await?;
            Ok(ActionResult {
                success: true,
                message: format!("Scrolled {} by {}", dir_str, amount),
                data: None,
            })
        }

        AgentAction::Wait {
            duration_ms,
            selector,
        } => {
            if let Some(ms) = duration_ms {
                client.wait(*ms).await?;
                Ok(ActionResult {
                    success: true,
                    message: format!("Waited {} ms", ms),
                    data: None,
                })
            } else if let Some(sel) = selector {
                match client.wait_for_element(sel, 10_000).await {
                    Ok(_) => Ok(ActionResult {
                        success: true,
                        message: format!("Element appeared: {}", sel),
                        data: None,
                    }),
                    Err(e) => Ok(ActionResult {
                        success: false,
                        message: format!("Element did not appear: {}", e),
                        data: None,
                    }),
                }
            } else {
                Ok(ActionResult {
                    success: true,
                    message: "Nothing to wait for".to_string(),
                    data: None,
                })
            }
        }

        AgentAction::Extract { selectors } => {
            let data = client.extract_data(selectors).await?;
            Ok(ActionResult {
                success: true,
                message: format!("Extracted {} field(s)", selectors.len()),
                data: Some(data),
            })
        }

        AgentAction::GoBack => {
            client.go_back().await?;
            Ok(ActionResult {
                success: true,
                message: "Went back".to_string(),
                data: None,
            })
        }

        AgentAction::None => Ok(ActionResult {
            success: true,
            message: "No action taken".to_string(),
            data: None,
        }),
    }
}
