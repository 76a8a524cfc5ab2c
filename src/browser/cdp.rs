//! Raw-WebSocket CDP client.
//!
//! One client per task run. It either attaches to an external Chrome's page
//! target (discovered through the debug endpoint's `/json/list`) or spawns a
//! fresh Chrome and waits for its debug port to come up. Commands are
//! correlated to responses by id through a oneshot map filled by a reader
//! task.

use crate::browser::config::{ConnectConfig, LaunchConfig};
use crate::browser::{launcher, port::allocate_cdp_port};
use crate::error::{Result, WebpilotError};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

const COMMAND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const LAUNCH_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
const LAUNCH_MAX_POLLS: u32 = 30;

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Interactive element surfaced to the LLM.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomElement {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    pub selector: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub visible: bool,
}

/// Page state snapshot handed to the LLM each step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomContext {
    pub url: String,
    pub title: Option<String>,
    pub elements: Vec<DomElement>,
}

pub struct CdpClient {
    ws_tx: Option<Arc<Mutex<WsSink>>>,
    responses: Arc<Mutex<HashMap<u32, tokio::sync::oneshot::Sender<serde_json::Value>>>>,
    /// Pid of a Chrome we spawned; None in attach mode
    chrome_pid: Option<u32>,
    current_url: Arc<Mutex<String>>,
    msg_id: Arc<Mutex<u32>>,
}

impl CdpClient {
    /// Obtain a connected client per the chosen configuration.
    pub async fn connect(config: &ConnectConfig) -> Result<Self> {
        match config {
            ConnectConfig::Attach { cdp_url } => Self::attach(cdp_url).await,
            ConnectConfig::Launch(launch) => Self::launch(launch).await,
        }
    }

    fn new() -> Self {
        Self {
            ws_tx: None,
            responses: Arc::new(Mutex::new(HashMap::new())),
            chrome_pid: None,
            current_url: Arc::new(Mutex::new(String::new())),
            msg_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Attach to an already-running Chrome at the given debug URL.
    pub async fn attach(cdp_url: &str) -> Result<Self> {
        let mut client = Self::new();
        let ws_url = discover_page_target(cdp_url).await?;
        client.open_websocket(&ws_url).await?;
        tracing::info!("Attached to running Chrome at {}", cdp_url);
        Ok(client)
    }

    /// Launch Chrome and connect once its debug port answers.
    pub async fn launch(config: &LaunchConfig) -> Result<Self> {
        let mut client = Self::new();
        let cdp_port = allocate_cdp_port();

        let mut cmd = launcher::build_command(config, cdp_port);
        let child = cmd.spawn().map_err(|e| {
            WebpilotError::Browser(format!(
                "Failed to launch Chrome at {:?}: {}",
                config.chrome_path, e
            ))
        })?;
        client.chrome_pid = Some(child.id());
        tracing::info!(
            "Launched Chrome pid={} profile={:?} cdp_port={}",
            child.id(),
            config.profile_directory,
            cdp_port
        );

        let base_url = format!("http://127.0.0.1:{}", cdp_port);
        let mut last_error = String::new();
        for poll in 1..=LAUNCH_MAX_POLLS {
            tokio::time::sleep(LAUNCH_POLL_INTERVAL).await;
            match discover_page_target(&base_url).await {
                Ok(ws_url) => {
                    client.open_websocket(&ws_url).await?;
                    client.apply_viewport(config).await?;
                    return Ok(client);
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::debug!("Waiting for Chrome ({}/{}): {}", poll, LAUNCH_MAX_POLLS, last_error);
                }
            }
        }

        // The spawned Chrome never became controllable; reap it.
        client.kill_chrome();
        Err(WebpilotError::Browser(format!(
            "Chrome did not expose a page target after {} polls: {}",
            LAUNCH_MAX_POLLS, last_error
        )))
    }

    async fn open_websocket(&mut self, ws_url: &str) -> Result<()> {
        let (ws_stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| WebpilotError::Cdp(format!("WebSocket connect failed: {}", e)))?;
        let (tx, mut rx) = StreamExt::split(ws_stream);
        self.ws_tx = Some(Arc::new(Mutex::new(tx)));

        let responses = self.responses.clone();
        tokio::spawn(async move {
            while let Some(msg) = rx.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                            if let Some(id) = value.get("id").and_then(|i| i.as_u64()) {
                                if let Some(sender) =
                                    responses.lock().await.remove(&(id as u32))
                                {
                                    let _ = sender.send(value);
                                }
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::debug!("CDP WebSocket closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!("CDP WebSocket error: {:?}", e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        self.send_command("Page.enable", json!({})).await?;
        self.send_command("Runtime.enable", json!({})).await?;
        Ok(())
    }

    /// Match the CSS viewport to the launch window size.
    async fn apply_viewport(&self, config: &LaunchConfig) -> Result<()> {
        self.send_command(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": config.viewport.width,
                "height": config.viewport.height,
                "deviceScaleFactor": 0,
                "mobile": false
            }),
        )
        .await?;
        Ok(())
    }

    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let tx = self
            .ws_tx
            .as_ref()
            .ok_or_else(|| WebpilotError::Cdp("WebSocket not connected".to_string()))?;

        let (id, rx) = {
            let mut msg_id = self.msg_id.lock().await;
            *msg_id += 1;
            let id = *msg_id - 1;
            let (tx, rx) = tokio::sync::oneshot::channel();
            self.responses.lock().await.insert(id, tx);
            (id, rx)
        };

        let command = json!({
            "id": id,
            "method": method,
            "params": params
        });

        {
            let mut tx_guard = tx.lock().await;
            tx_guard
                .send(WsMessage::Text(command.to_string()))
                .await
                .map_err(|e| WebpilotError::Cdp(format!("Failed to send {}: {}", method, e)))?;
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(WebpilotError::Cdp("Response channel closed".to_string())),
            Err(_) => Err(WebpilotError::Cdp(format!("{} timed out", method))),
        }
    }

    /// Evaluate a JS expression and return its value.
    async fn eval_value(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true
                }),
            )
            .await?;
        Ok(result
            .get("result")
            .and_then(|r| r.get("result"))
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.send_command("Page.navigate", json!({ "url": url })).await?;
        *self.current_url.lock().await = url.to_string();
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        tracing::info!("Navigated to {}", url);
        Ok(())
    }

    pub async fn get_url(&self) -> Result<String> {
        match self.eval_value("window.location.href").await? {
            serde_json::Value::String(url) => {
                *self.current_url.lock().await = url.clone();
                Ok(url)
            }
            _ => Ok(self.current_url.lock().await.clone()),
        }
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        let escaped = escape_selector(selector);
        let clicked = self
            .eval_value(&format!(
                "(function() {{ const el = document.querySelector('{}'); if (el) {{ el.click(); return true; }} return false; }})()",
                escaped
            ))
            .await?
            .as_bool()
            .unwrap_or(false);

        if clicked {
            Ok(())
        } else {
            Err(WebpilotError::Cdp(format!("Element not found: {}", selector)))
        }
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let escaped_selector = escape_selector(selector);
        let escaped_text = escape_selector(text);
        let typed = self
            .eval_value(&format!(
                "(function() {{ const el = document.querySelector('{}'); if (el) {{ el.focus(); el.value = '{}'; el.dispatchEvent(new Event('input', {{bubbles: true}})); return true; }} return false; }})()",
                escaped_selector, escaped_text
            ))
            .await?
            .as_bool()
            .unwrap_or(false);

        if typed {
            Ok(())
        } else {
            Err(WebpilotError::Cdp(format!("Element not found: {}", selector)))
        }
    }

    pub async fn press_key(&self, key: &str) -> Result<()> {
        let key_code = match key {
            "Enter" => 13,
            "Tab" => 9,
            "Escape" => 27,
            "Backspace" => 8,
            "ArrowUp" => 38,
            "ArrowDown" => 40,
            "ArrowLeft" => 37,
            "ArrowRight" => 39,
            _ => key.chars().next().map(|c| c as i32).unwrap_or(0),
        };

        for event_type in ["keyDown", "keyUp"] {
            self.send_command(
                "Input.dispatchKeyEvent",
                json!({
                    "type": event_type,
                    "key": key,
                    "code": key,
                    "windowsVirtualKeyCode": key_code
                }),
            )
            .await?;
        }
        Ok(())
    }

    pub async fn scroll(&self, direction: &str, amount: u32) -> Result<()> {
        let delta = amount as i64;
        let (x, y) = match direction {
            "up" => (0, -delta),
            "down" => (0, delta),
            "left" => (-delta, 0),
            "right" => (delta, 0),
            _ => (0, delta),
        };
        self.eval_value(&format!("window.scrollBy({}, {})", x, y)).await?;
        Ok(())
    }

    pub async fn wait(&self, duration_ms: u64) -> Result<()> {
        tokio::time::sleep(std::time::Duration::from_millis(duration_ms)).await;
        Ok(())
    }

    pub async fn wait_for_element(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let timeout = std::time::Duration::from_millis(timeout_ms);
        let start = std::time::Instant::now();
        let escaped = escape_selector(selector);

        loop {
            let found = self
                .eval_value(&format!("!!document.querySelector('{}')", escaped))
                .await?
                .as_bool()
                .unwrap_or(false);
            if found {
                return Ok(());
            }
            if start.elapsed() > timeout {
                return Err(WebpilotError::Cdp(format!(
                    "Timeout waiting for element: {}",
                    selector
                )));
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    pub async fn go_back(&self) -> Result<()> {
        self.eval_value("history.back()").await?;
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(())
    }

    /// Extract text for each named selector.
    pub async fn extract_data(
        &self,
        selectors: &HashMap<String, String>,
    ) -> Result<serde_json::Value> {
        let mut result = serde_json::Map::new();
        for (name, selector) in selectors {
            let escaped = escape_selector(selector);
            let value = self
                .eval_value(&format!(
                    "(function() {{ const el = document.querySelector('{}'); return el ? (el.innerText || el.value || el.textContent || '') : ''; }})()",
                    escaped
                ))
                .await?;
            let text = value.as_str().unwrap_or("").to_string();
            result.insert(name.clone(), serde_json::Value::String(text));
        }
        Ok(serde_json::Value::Object(result))
    }

    /// Snapshot the interactive elements of the current page.
    pub async fn dom_context(&self) -> Result<DomContext> {
        let url = self.get_url().await?;

        let js = r##"
            (function() {
                const elements = [];

                function getSelector(el) {
                    if (el.id) return "#" + el.id;
                    if (el.className && typeof el.className === "string") {
                        const classes = el.className.trim().split(/\s+/).filter(c => c);
                        if (classes.length > 0) {
                            return el.tagName.toLowerCase() + "." + classes.slice(0, 2).join(".");
                        }
                    }
                    return el.tagName.toLowerCase();
                }

                const interactives = document.querySelectorAll(
                    "a, button, input, select, textarea, [onclick], [role=\"button\"], [tabindex]"
                );

                interactives.forEach(el => {
                    const rect = el.getBoundingClientRect();
                    elements.push({
                        tag: el.tagName.toLowerCase(),
                        id: el.id || null,
                        selector: getSelector(el),
                        text: (el.innerText || el.value || "").substring(0, 100),
                        placeholder: el.placeholder || null,
                        aria_label: el.getAttribute("aria-label") || null,
                        visible: rect.width > 0 && rect.height > 0
                    });
                });

                return { elements: elements, title: document.title };
            })();
        "##;

        let dom_data = self.eval_value(js).await?;

        let title = dom_data
            .get("title")
            .and_then(|t| t.as_str())
            .map(|s| s.to_string());
        let elements: Vec<DomElement> =
            serde_json::from_value(dom_data.get("elements").cloned().unwrap_or_default())
                .unwrap_or_default();

        Ok(DomContext {
            url,
            title,
            elements,
        })
    }

    /// Disconnect, and kill Chrome only if this client spawned it.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.ws_tx.take() {
            let mut tx_guard = tx.lock().await;
            let _ = tx_guard.close().await;
        }
        self.kill_chrome();
        tracing::info!("CDP client closed");
        Ok(())
    }

    fn kill_chrome(&mut self) {
        if let Some(pid) = self.chrome_pid.take() {
            kill_pid(pid);
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        // Backstop: a launched Chrome must not outlive a dropped client.
        if let Some(pid) = self.chrome_pid {
            kill_pid(pid);
        }
    }
}

fn kill_pid(pid: u32) {
    #[cfg(unix)]
    {
        let _ = Command::new("kill").arg(pid.to_string()).spawn();
    }
    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .spawn();
    }
}

fn escape_selector(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Find the first page target's WebSocket URL through the debug endpoint.
async fn discover_page_target(base_url: &str) -> Result<String> {
    let list_url = format!("{}/json/list", base_url.trim_end_matches('/'));
    let response = reqwest::get(&list_url)
        .await
        .map_err(|e| WebpilotError::Cdp(format!("Target list request failed: {}", e)))?;
    if !response.status().is_success() {
        return Err(WebpilotError::Cdp(format!(
            "Target list returned HTTP {}",
            response.status()
        )));
    }
    let targets: serde_json::Value = response
        .json()
        .await
        .map_err(|e| WebpilotError::Cdp(format!("Failed to parse target list: {}", e)))?;

    let page_target = targets
        .as_array()
        .and_then(|arr| {
            arr.iter()
                .find(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
        })
        .ok_or_else(|| WebpilotError::Cdp("No page target found".to_string()))?;

    page_target
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| WebpilotError::Cdp("No webSocketDebuggerUrl in page target".to_string()))
}
