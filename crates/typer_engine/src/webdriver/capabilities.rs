use std::fmt;
use std::path::PathBuf;

use serde_json::{json, Value};

pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

impl Browser {
    pub fn as_str(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Some(Browser::Chrome),
            "firefox" => Some(Browser::Firefox),
            _ => None,
        }
    }

    /// chromedriver and geckodriver default ports.
    pub fn default_webdriver_url(self) -> &'static str {
        match self {
            Browser::Chrome => "http://localhost:9515",
            Browser::Firefox => "http://localhost:4444",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    pub browser: Browser,
    pub profile: Option<PathBuf>,
    /// Attach to a browser the operator already started.
    pub use_existing: bool,
    pub debugging_port: u16,
    pub marionette_port: Option<u16>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            browser: Browser::Chrome,
            profile: None,
            use_existing: false,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            marionette_port: None,
        }
    }
}

impl BrowserOptions {
    /// Body of the W3C `New Session` request.
    pub fn capabilities(&self) -> Value {
        let always_match = match self.browser {
            Browser::Chrome => {
                let mut options = json!({});
                if self.use_existing {
                    options["debuggerAddress"] = json!(format!("127.0.0.1:{}", self.debugging_port));
                } else if let Some(profile) = &self.profile {
                    options["args"] = json!([format!("--user-data-dir={}", profile.display())]);
                }
                json!({ "browserName": "chrome", "goog:chromeOptions": options })
            }
            Browser::Firefox => {
                let mut options = json!({});
                if let Some(profile) = &self.profile {
                    options["args"] = json!(["-profile", profile.display().to_string()]);
                }
                json!({ "browserName": "firefox", "moz:firefoxOptions": options })
            }
        };
        json!({ "capabilities": { "alwaysMatch": always_match } })
    }

    /// How the operator should start the driver for `--use-existing`.
    pub fn attach_hint(&self) -> String {
        match self.browser {
            Browser::Chrome => format!(
                "start Chrome with --remote-debugging-port={} and run chromedriver",
                self.debugging_port
            ),
            Browser::Firefox => format!(
                "start Firefox with -marionette and run geckodriver --connect-existing --marionette-port {}",
                self.marionette_port.unwrap_or(2828)
            ),
        }
    }
}
