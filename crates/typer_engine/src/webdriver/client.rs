use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};
use typer_logging::{typer_debug, typer_trace};

use crate::editor::DriverError;

/// W3C key under which element references are returned.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735dcc8a8a";

const KEY_CONTROL: &str = "\u{E009}";
const KEY_META: &str = "\u{E03D}";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9515".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Minimal async W3C WebDriver client.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl WebDriverClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, DriverError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DriverError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            session_id: None,
        })
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub async fn new_session(&mut self, capabilities: Value) -> Result<String, DriverError> {
        let value = self.send(Method::POST, "/session", Some(capabilities)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol_shape("new session response without sessionId"))?
            .to_string();
        typer_debug!("WebDriver session {session_id} created");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    pub async fn delete_session(&mut self) -> Result<(), DriverError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        self.send(Method::DELETE, &format!("/session/{session_id}"), None)
            .await?;
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.session_send(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.session_send(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| protocol_shape("current url is not a string"))
    }

    /// First element matching `css`, or `None` when nothing matches.
    pub async fn find_element(&self, css: &str) -> Result<Option<String>, DriverError> {
        let body = json!({ "using": "css selector", "value": css });
        match self.session_send(Method::POST, "/element", Some(body)).await {
            Ok(value) => element_id(&value).map(Some),
            Err(DriverError::ElementNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn find_elements(&self, css: &str) -> Result<Vec<String>, DriverError> {
        let body = json!({ "using": "css selector", "value": css });
        let value = self.session_send(Method::POST, "/elements", Some(body)).await?;
        value
            .as_array()
            .ok_or_else(|| protocol_shape("find elements response is not an array"))?
            .iter()
            .map(element_id)
            .collect()
    }

    /// Switch into the frame `element`, or back to the top-level context.
    pub async fn switch_to_frame(&self, element: Option<&str>) -> Result<(), DriverError> {
        let id = match element {
            Some(element) => json!({ ELEMENT_KEY: element }),
            None => Value::Null,
        };
        self.session_send(Method::POST, "/frame", Some(json!({ "id": id })))
            .await?;
        Ok(())
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        let body = json!({ "script": script, "args": args });
        self.session_send(Method::POST, "/execute/sync", Some(body))
            .await
    }

    /// Press the paste shortcut: Ctrl+V, or Cmd+V when `command_key` is set.
    pub async fn press_paste(&self, command_key: bool) -> Result<(), DriverError> {
        let modifier = if command_key { KEY_META } else { KEY_CONTROL };
        let body = json!({
            "actions": [{
                "type": "key",
                "id": "keyboard",
                "actions": [
                    { "type": "keyDown", "value": modifier },
                    { "type": "keyDown", "value": "v" },
                    { "type": "keyUp", "value": "v" },
                    { "type": "keyUp", "value": modifier }
                ]
            }]
        });
        self.session_send(Method::POST, "/actions", Some(body)).await?;
        self.session_send(Method::DELETE, "/actions", None).await?;
        Ok(())
    }

    async fn session_send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let session_id = self
            .session_id
            .as_deref()
            .ok_or_else(|| DriverError::Transport("no active WebDriver session".into()))?;
        self.send(method, &format!("/session/{session_id}{path}"), body)
            .await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.base_url, path);
        typer_trace!("WebDriver {method} {path}");
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            let bytes = serde_json::to_vec(&body).map_err(|e| DriverError::Transport(e.to_string()))?;
            request = request
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .body(bytes);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let mut payload: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| DriverError::Protocol {
                status: status.as_u16(),
                error: "invalid json".into(),
                message: e.to_string(),
            })?
        };
        let value = payload.get_mut("value").map(Value::take).unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(value);
        }
        Err(map_protocol_error(status.as_u16(), &value))
    }
}

fn element_id(value: &Value) -> Result<String, DriverError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| protocol_shape("missing element reference"))
}

fn protocol_shape(message: &str) -> DriverError {
    DriverError::Protocol {
        status: 200,
        error: "unexpected response".into(),
        message: message.into(),
    }
}

fn map_protocol_error(status: u16, value: &Value) -> DriverError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match error.as_str() {
        "no such element" | "no such frame" => DriverError::ElementNotFound,
        "stale element reference" => DriverError::StaleElement,
        "timeout" | "script timeout" => DriverError::Timeout,
        _ => DriverError::Protocol {
            status,
            error,
            message,
        },
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DriverError {
    if err.is_timeout() {
        return DriverError::Timeout;
    }
    DriverError::Transport(err.to_string())
}
