use std::fmt;

/// Reference to a located editor element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorHandle {
    /// WebDriver element reference, or any opaque id for other drivers.
    pub element_id: String,
    /// Frame element the editor lives in, if it is inside an iframe.
    pub frame: Option<String>,
    pub label: String,
}

impl EditorHandle {
    pub fn new(element_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
            frame: None,
            label: label.into(),
        }
    }

    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }
}

impl fmt::Display for EditorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("editor element not found")]
    ElementNotFound,
    #[error("editor element is no longer attached to the page")]
    StaleElement,
    #[error("browser request timed out")]
    Timeout,
    #[error("webdriver error {status} {error}: {message}")]
    Protocol {
        status: u16,
        error: String,
        message: String,
    },
    #[error("browser unreachable: {0}")]
    Transport(String),
}

/// How the operator asked for the editor to be found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorQuery {
    pub iframe_id: Option<String>,
    pub editor_id: Option<String>,
    pub detect_multiple: bool,
}

/// One editor found on the page, offered to the operator when there is a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCandidate {
    pub handle: EditorHandle,
    /// Which discovery rule matched, e.g. `TinyMCE iframe`.
    pub source: String,
}

/// Browser-side boundary of every insertion strategy.
pub trait EditorDriver {
    fn locate_editor(&mut self, query: &EditorQuery) -> Result<Vec<EditorCandidate>, DriverError>;
    /// Visible text of the editor: text nodes, `<br>` and block edges as `\n`.
    fn read_current_content(&mut self, handle: &EditorHandle) -> Result<String, DriverError>;
    /// Remove everything in the editor, leaving it as a fresh document.
    fn clear_content(&mut self, handle: &EditorHandle) -> Result<(), DriverError>;
    /// Append `fragment` at the end of the editor content.
    fn set_content_fragment(&mut self, handle: &EditorHandle, fragment: &str) -> Result<(), DriverError>;
    /// Trigger the platform paste shortcut inside the editor.
    fn paste_clipboard(&mut self, handle: &EditorHandle) -> Result<(), DriverError>;
}
