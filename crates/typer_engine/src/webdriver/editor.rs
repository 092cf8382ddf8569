use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::runtime::Runtime;
use typer_logging::{typer_debug, typer_info, typer_warn};

use super::capabilities::BrowserOptions;
use super::client::{ClientSettings, WebDriverClient, ELEMENT_KEY};
use crate::editor::{DriverError, EditorCandidate, EditorDriver, EditorHandle, EditorQuery};
use crate::markup::{render_fragment, BLOCK_TAGS};
use crate::strategy::CancelFlag;

const TINYMCE_FRAMES: &[&str] = &[
    "iframe.tox-edit-area__iframe",
    "iframe#tinymce_ifr",
    "iframe[id$='_ifr']",
    "div.mce-edit-area iframe",
];
const CKEDITOR_FRAME: &str = "iframe.cke_wysiwyg_frame";
const QUILL_EDITOR: &str = ".ql-editor";
const CONTENT_EDITABLE: &str = "[contenteditable='true']";
const INTERRUPT_EXIT_CODE: i32 = 130;

/// Appends text already passed through `render_fragment`. Tabs go into
/// `white-space: pre` spans so they keep their width and read back as tabs.
const APPEND_TEXT_SCRIPT: &str = r#"
const el = arguments[0];
const text = arguments[1];
const doc = el.ownerDocument;
let target = el;
const last = el.lastElementChild;
if (last && last.tagName === 'P') {
  target = last;
}
target.querySelectorAll('br[data-mce-bogus]').forEach((br) => br.remove());
text.split('\n').forEach((line, i) => {
  if (i > 0) target.appendChild(doc.createElement('br'));
  line.split('\t').forEach((part, j) => {
    if (j > 0) {
      const tab = doc.createElement('span');
      tab.style.whiteSpace = 'pre';
      tab.textContent = '\t';
      target.appendChild(tab);
    }
    if (part.length > 0) target.appendChild(doc.createTextNode(part));
  });
});
"#;

const CLEAR_SCRIPT: &str = "arguments[0].innerHTML = '<p><br data-mce-bogus=\"1\"></p>';";

const READ_TEXT_SCRIPT: &str = r#"
const el = arguments[0];
const blocks = new Set(arguments[1]);
let out = '';
const boundary = () => {
  if (out.length > 0 && !out.endsWith('\n')) out += '\n';
};
const walk = (node) => {
  if (node.nodeType === 3) {
    out += node.data.replace(/\u00a0/g, ' ');
    return;
  }
  if (node.nodeType !== 1) return;
  const tag = node.tagName.toLowerCase();
  if (tag === 'br') {
    if (!node.hasAttribute('data-mce-bogus')) out += '\n';
    return;
  }
  if (tag === 'script' || tag === 'style') return;
  const block = blocks.has(tag);
  if (block) boundary();
  node.childNodes.forEach(walk);
  if (block) boundary();
};
el.childNodes.forEach(walk);
return out;
"#;

const READ_HTML_SCRIPT: &str = "return arguments[0].innerHTML;";
const SET_HTML_SCRIPT: &str = "arguments[0].innerHTML = arguments[1];";

const FOCUS_END_SCRIPT: &str = r#"
const el = arguments[0];
el.focus();
const doc = el.ownerDocument;
const range = doc.createRange();
range.selectNodeContents(el);
range.collapse(false);
const sel = doc.defaultView.getSelection();
sel.removeAllRanges();
sel.addRange(range);
"#;

#[derive(Debug, Clone)]
pub struct EditorSettings {
    pub client: ClientSettings,
    pub browser: BrowserOptions,
    pub locate_timeout: Duration,
    pub poll_interval: Duration,
    /// Fragments are HTML and are applied through `innerHTML`.
    pub formatted: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            browser: BrowserOptions::default(),
            locate_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            formatted: false,
        }
    }
}

/// Routes Ctrl-C to the run's cancel flag until dropped.
#[must_use = "Ctrl-C stops cancelling the run when the guard is dropped"]
pub struct InterruptGuard {
    armed: Arc<AtomicBool>,
}

impl InterruptGuard {
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

/// [`EditorDriver`] over a W3C WebDriver session. Each call blocks on the
/// adapter's own runtime.
pub struct WebDriverEditor {
    runtime: Runtime,
    client: WebDriverClient,
    settings: EditorSettings,
    /// Frame selected through `--iframe-id`, entered before any editor frame.
    base_frame: Option<String>,
    /// Editor whose browsing context is currently selected.
    entered: Option<EditorHandle>,
    html_buffer: Option<String>,
    /// Last character appended in plain mode; decides how a leading space renders.
    last_char: Option<char>,
}

impl WebDriverEditor {
    /// Create (or attach to) a browser session.
    pub fn connect(settings: EditorSettings) -> Result<Self, DriverError> {
        let mut editor = Self::with_client(settings)?;
        let capabilities = editor.settings.browser.capabilities();
        let session_id = editor
            .runtime
            .block_on(editor.client.new_session(capabilities))?;
        typer_info!(
            "Connected to {} through {} (session {session_id})",
            editor.settings.browser.browser,
            editor.settings.client.base_url
        );
        Ok(editor)
    }

    fn with_client(settings: EditorSettings) -> Result<Self, DriverError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| DriverError::Transport(format!("runtime: {e}")))?;
        let client = WebDriverClient::new(&settings.client)?;
        Ok(Self {
            runtime,
            client,
            settings,
            base_frame: None,
            entered: None,
            html_buffer: None,
            last_char: None,
        })
    }

    /// Set `cancel` on Ctrl-C while the returned guard lives. Once it is
    /// dropped, Ctrl-C exits the process like an unhandled interrupt.
    pub fn install_interrupt_handler(&self, cancel: CancelFlag) -> InterruptGuard {
        let armed = Arc::new(AtomicBool::new(true));
        let listening = Arc::clone(&armed);
        self.runtime.spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listening.load(Ordering::SeqCst) {
                    typer_warn!("Interrupt received after the run; exiting");
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
                typer_warn!("Interrupt received; stopping after the current step");
                cancel.cancel();
            }
        });
        InterruptGuard { armed }
    }

    pub fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.entered = None;
        self.runtime.block_on(self.client.navigate(url))
    }

    pub fn current_url(&mut self) -> Result<String, DriverError> {
        self.runtime.block_on(self.client.current_url())
    }

    /// End the WebDriver session; the browser closes unless it was attached.
    pub fn quit(&mut self) -> Result<(), DriverError> {
        self.runtime.block_on(self.client.delete_session())
    }

    async fn top_level(client: &WebDriverClient, base_frame: Option<&str>) -> Result<(), DriverError> {
        client.switch_to_frame(None).await?;
        if let Some(frame) = base_frame {
            client.switch_to_frame(Some(frame)).await?;
        }
        Ok(())
    }

    fn enter(&mut self, handle: &EditorHandle) -> Result<(), DriverError> {
        if self.entered.as_ref() == Some(handle) {
            return Ok(());
        }
        let client = &self.client;
        let base_frame = self.base_frame.as_deref();
        self.runtime.block_on(async {
            Self::top_level(client, base_frame).await?;
            if let Some(frame) = handle.frame.as_deref() {
                client.switch_to_frame(Some(frame)).await?;
            }
            Ok::<_, DriverError>(())
        })?;
        self.entered = Some(handle.clone());
        Ok(())
    }

    fn execute_on(&mut self, handle: &EditorHandle, script: &str, extra: Vec<Value>) -> Result<Value, DriverError> {
        self.enter(handle)?;
        let mut args = vec![json!({ ELEMENT_KEY: handle.element_id })];
        args.extend(extra);
        let result = self.runtime.block_on(self.client.execute(script, args));
        if matches!(result, Err(DriverError::StaleElement)) {
            self.entered = None;
        }
        result
    }

    async fn discover(
        client: &WebDriverClient,
        query: &EditorQuery,
        base_frame: &mut Option<String>,
    ) -> Result<Vec<EditorCandidate>, DriverError> {
        client.switch_to_frame(None).await?;
        *base_frame = None;
        if let Some(iframe_id) = &query.iframe_id {
            match client.find_element(&id_selector(iframe_id)).await? {
                Some(frame) => {
                    client.switch_to_frame(Some(&frame)).await?;
                    *base_frame = Some(frame);
                }
                None => typer_warn!("No iframe with id {iframe_id:?}; searching the page instead"),
            }
        }
        let base = base_frame.clone();
        let mut found = Vec::new();

        if let Some(editor_id) = &query.editor_id {
            if let Some(element) = client.find_element(&id_selector(editor_id)).await? {
                found.push(EditorCandidate {
                    handle: EditorHandle::new(element, format!("#{editor_id}")),
                    source: "editor id".into(),
                });
                if !query.detect_multiple {
                    return Ok(found);
                }
            }
        }

        for selector in TINYMCE_FRAMES {
            let bodies = frame_bodies(client, selector, base.as_deref(), "TinyMCE").await?;
            if !bodies.is_empty() && !query.detect_multiple {
                return Ok(bodies.into_iter().take(1).collect());
            }
            for body in bodies {
                if !found.iter().any(|c: &EditorCandidate| c.handle == body.handle) {
                    found.push(body);
                }
            }
        }

        // Fallback scans: every match is offered when there are several.
        let ckeditor = frame_bodies(client, CKEDITOR_FRAME, base.as_deref(), "CKEditor").await?;
        if !ckeditor.is_empty() && !query.detect_multiple {
            return Ok(ckeditor);
        }
        found.extend(ckeditor);

        for (selector, source) in [(QUILL_EDITOR, "Quill"), (CONTENT_EDITABLE, "contenteditable")] {
            let elements = client.find_elements(selector).await?;
            let candidates: Vec<EditorCandidate> = elements
                .into_iter()
                .enumerate()
                .map(|(idx, element)| EditorCandidate {
                    handle: EditorHandle::new(element, format!("{source} #{}", idx + 1)),
                    source: source.to_string(),
                })
                .collect();
            if !candidates.is_empty() && !query.detect_multiple {
                return Ok(candidates);
            }
            for candidate in candidates {
                if !found.iter().any(|c| c.handle == candidate.handle) {
                    found.push(candidate);
                }
            }
        }
        Ok(found)
    }

    fn read_html(&mut self, handle: &EditorHandle) -> Result<String, DriverError> {
        let value = self.execute_on(handle, READ_HTML_SCRIPT, Vec::new())?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

/// `<body>` of every frame matching `selector`, as candidates.
async fn frame_bodies(
    client: &WebDriverClient,
    selector: &str,
    base_frame: Option<&str>,
    source: &str,
) -> Result<Vec<EditorCandidate>, DriverError> {
    let frames = client.find_elements(selector).await?;
    let mut bodies = Vec::new();
    for (idx, frame) in frames.into_iter().enumerate() {
        client.switch_to_frame(Some(&frame)).await?;
        let body = client.find_element("body").await?;
        WebDriverEditor::top_level(client, base_frame).await?;
        if let Some(body) = body {
            bodies.push(EditorCandidate {
                handle: EditorHandle::new(body, format!("{source} #{} ({selector})", idx + 1))
                    .in_frame(frame),
                source: source.to_string(),
            });
        }
    }
    Ok(bodies)
}

fn id_selector(id: &str) -> String {
    format!("[id='{}']", id.replace('\\', "\\\\").replace('\'', "\\'"))
}

impl EditorDriver for WebDriverEditor {
    fn locate_editor(&mut self, query: &EditorQuery) -> Result<Vec<EditorCandidate>, DriverError> {
        let deadline = Instant::now() + self.settings.locate_timeout;
        self.entered = None;
        self.html_buffer = None;
        self.last_char = None;
        loop {
            let client = &self.client;
            let base_frame = &mut self.base_frame;
            let candidates = self
                .runtime
                .block_on(Self::discover(client, query, base_frame))?;
            if !candidates.is_empty() {
                typer_debug!("Editor discovery found {} candidate(s)", candidates.len());
                return Ok(candidates);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::ElementNotFound);
            }
            std::thread::sleep(self.settings.poll_interval);
        }
    }

    fn read_current_content(&mut self, handle: &EditorHandle) -> Result<String, DriverError> {
        let blocks = json!(BLOCK_TAGS);
        let value = self.execute_on(handle, READ_TEXT_SCRIPT, vec![blocks])?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn clear_content(&mut self, handle: &EditorHandle) -> Result<(), DriverError> {
        self.execute_on(handle, CLEAR_SCRIPT, Vec::new())?;
        self.html_buffer = None;
        self.last_char = None;
        Ok(())
    }

    fn set_content_fragment(&mut self, handle: &EditorHandle, fragment: &str) -> Result<(), DriverError> {
        if !self.settings.formatted {
            let rendered = render_fragment(self.last_char, fragment);
            self.execute_on(handle, APPEND_TEXT_SCRIPT, vec![json!(rendered)])?;
            self.last_char = fragment.chars().last().or(self.last_char);
            return Ok(());
        }
        let mut buffer = match self.html_buffer.take() {
            Some(buffer) => buffer,
            None => self.read_html(handle)?,
        };
        buffer.push_str(fragment);
        let applied = self.execute_on(handle, SET_HTML_SCRIPT, vec![json!(buffer)]);
        if applied.is_ok() {
            self.html_buffer = Some(buffer);
        } else {
            // Keep the buffer in step with what the editor shows.
            buffer.truncate(buffer.len() - fragment.len());
            self.html_buffer = Some(buffer);
        }
        applied.map(|_| ())
    }

    fn paste_clipboard(&mut self, handle: &EditorHandle) -> Result<(), DriverError> {
        self.execute_on(handle, FOCUS_END_SCRIPT, Vec::new())?;
        let command_key = cfg!(target_os = "macos");
        self.runtime.block_on(self.client.press_paste(command_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_selector_escapes_quotes() {
        assert_eq!(id_selector("main"), "[id='main']");
        assert_eq!(id_selector("it's"), "[id='it\\'s']");
    }

    #[test]
    fn interrupt_handler_disarms_with_its_guard() {
        let editor = WebDriverEditor::with_client(EditorSettings::default()).unwrap();
        let cancel = CancelFlag::new();

        let guard = editor.install_interrupt_handler(cancel.clone());
        assert!(guard.is_armed());
        let armed = Arc::clone(&guard.armed);
        drop(guard);

        assert!(!armed.load(Ordering::SeqCst));
        assert!(!cancel.is_cancelled());
    }
}
