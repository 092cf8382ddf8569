use typer_logging::typer_debug;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// System clipboard capability, injected into the clipboard strategy.
pub trait Clipboard {
    fn read(&mut self) -> Result<String, ClipboardError>;
    fn write(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard through `arboard`.
pub struct SystemClipboard {
    inner: Result<arboard::Clipboard, ClipboardError>,
}

impl SystemClipboard {
    /// Open the platform clipboard. Failing to open it is not fatal: every
    /// call then reports `Unavailable`, which the strategy treats as a normal
    /// fallback.
    pub fn detect() -> Self {
        let inner = arboard::Clipboard::new().map_err(|err| {
            typer_debug!("No system clipboard: {err}");
            unavailable(err)
        });
        Self { inner }
    }

    fn clipboard(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        self.inner.as_mut().map_err(|err| err.clone())
    }
}

impl Clipboard for SystemClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        read_result(self.clipboard()?.get_text())
    }

    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard()?.set_text(text).map_err(unavailable)
    }
}

/// A clipboard without text reads as empty. Every other error is `Unavailable`.
fn read_result(result: Result<String, arboard::Error>) -> Result<String, ClipboardError> {
    match result {
        Ok(text) => Ok(text),
        Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
        Err(err) => Err(unavailable(err)),
    }
}

fn unavailable(err: arboard::Error) -> ClipboardError {
    ClipboardError::Unavailable(err.to_string())
}

/// Clipboard that is never available; used with `--no-clipboard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        Err(ClipboardError::Unavailable("clipboard disabled".into()))
    }

    fn write(&mut self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable("clipboard disabled".into()))
    }
}
