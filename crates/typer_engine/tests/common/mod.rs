#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use typer_core::SessionKey;
use typer_engine::{
    CancelFlag, Clipboard, ClipboardError, Clock, DriverError, EditorCandidate, EditorDriver,
    EditorHandle, EditorQuery,
};

pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(typer_logging::initialize_for_tests);
}

pub fn fixed_clock() -> Clock {
    Arc::new(|| "2026-01-01T00:00:00+00:00".to_string())
}

pub fn key_for(text: &str) -> SessionKey {
    SessionKey::new("https://example.com/edit", typer_engine::fingerprint(text))
}

pub type SharedText = Rc<RefCell<String>>;

/// In-memory editor. Fragments are appended verbatim.
pub struct FakeEditor {
    pub content: String,
    pub fragments: Vec<String>,
    /// Reject the fragment after this many were accepted.
    pub fail_after: Option<usize>,
    /// Source of pasted text; `None` makes paste a no-op.
    pub clipboard: Option<SharedText>,
    pub fail_paste: bool,
    pub fail_read: bool,
    /// Set this flag once this many fragments were accepted.
    pub cancel_after: Option<(usize, CancelFlag)>,
    pub candidates: Vec<EditorCandidate>,
    pub clears: usize,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            fragments: Vec::new(),
            fail_after: None,
            clipboard: None,
            fail_paste: false,
            fail_read: false,
            cancel_after: None,
            candidates: vec![EditorCandidate {
                handle: handle(),
                source: "contenteditable".into(),
            }],
            clears: 0,
        }
    }

    pub fn with_content(content: &str) -> Self {
        let mut editor = Self::new();
        editor.content = content.to_string();
        editor
    }

    pub fn submitted(&self) -> String {
        self.fragments.concat()
    }
}

pub fn handle() -> EditorHandle {
    EditorHandle::new("element-1", "fake editor")
}

impl EditorDriver for FakeEditor {
    fn locate_editor(&mut self, _query: &EditorQuery) -> Result<Vec<EditorCandidate>, DriverError> {
        if self.candidates.is_empty() {
            return Err(DriverError::ElementNotFound);
        }
        Ok(self.candidates.clone())
    }

    fn read_current_content(&mut self, _handle: &EditorHandle) -> Result<String, DriverError> {
        if self.fail_read {
            return Err(DriverError::StaleElement);
        }
        Ok(self.content.clone())
    }

    fn clear_content(&mut self, _handle: &EditorHandle) -> Result<(), DriverError> {
        self.clears += 1;
        self.content.clear();
        Ok(())
    }

    fn set_content_fragment(&mut self, _handle: &EditorHandle, fragment: &str) -> Result<(), DriverError> {
        if self.fail_after == Some(self.fragments.len()) {
            return Err(DriverError::Timeout);
        }
        self.fragments.push(fragment.to_string());
        self.content.push_str(fragment);
        if let Some((after, cancel)) = &self.cancel_after {
            if self.fragments.len() >= *after {
                cancel.cancel();
            }
        }
        Ok(())
    }

    fn paste_clipboard(&mut self, _handle: &EditorHandle) -> Result<(), DriverError> {
        if self.fail_paste {
            return Err(DriverError::Protocol {
                status: 500,
                error: "unknown error".into(),
                message: "paste rejected".into(),
            });
        }
        if let Some(source) = &self.clipboard {
            self.content.push_str(&source.borrow());
        }
        Ok(())
    }
}

/// Clipboard backed by a shared string, optionally unavailable.
pub struct FakeClipboard {
    pub text: SharedText,
    pub available: bool,
    /// Writes succeed but reads fail, like a clipboard holding foreign data.
    pub unreadable: bool,
    pub writes: Vec<String>,
}

impl FakeClipboard {
    pub fn holding(text: &str) -> Self {
        Self {
            text: Rc::new(RefCell::new(text.to_string())),
            available: true,
            unreadable: false,
            writes: Vec::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::holding("")
        }
    }

    pub fn shared(&self) -> SharedText {
        self.text.clone()
    }
}

impl Clipboard for FakeClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        if self.unreadable {
            return Err(ClipboardError::Unavailable("conversion failed".into()));
        }
        if !self.available {
            return Err(ClipboardError::Unavailable("no display".into()));
        }
        Ok(self.text.borrow().clone())
    }

    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        if !self.available {
            return Err(ClipboardError::Unavailable("no display".into()));
        }
        self.writes.push(text.to_string());
        *self.text.borrow_mut() = text.to_string();
        Ok(())
    }
}
