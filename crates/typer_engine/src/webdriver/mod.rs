//! W3C WebDriver adapter: an async HTTP client and the blocking
//! [`EditorDriver`](crate::EditorDriver) built on it.
mod capabilities;
mod client;
mod editor;

pub use capabilities::{Browser, BrowserOptions, DEFAULT_DEBUGGING_PORT};
pub use client::{ClientSettings, WebDriverClient, ELEMENT_KEY};
pub use editor::{EditorSettings, InterruptGuard, WebDriverEditor};
