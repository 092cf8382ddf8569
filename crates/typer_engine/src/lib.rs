//! tinytyper engine: content loading, session persistence, insertion
//! strategies and the run driver that executes core effects.
mod clipboard;
mod codec;
mod content;
mod decode;
mod editor;
mod markup;
mod persist;
mod runner;
mod session_store;
mod store;
mod strategy;
mod verify;
pub mod webdriver;

pub use clipboard::{Clipboard, ClipboardError, NoClipboard, SystemClipboard};
pub use codec::{
    is_sealed, CodecError, PlainCodec, RecordCodec, SealedCodec, DEFAULT_KDF_ITERATIONS, KDF_NAME,
    SEALED_FORMAT,
};
pub use content::{
    fingerprint, load_content, ContentError, ContentPayload, SourcePosition, SourceSpan,
    DEFAULT_SEPARATOR,
};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use editor::{DriverError, EditorCandidate, EditorDriver, EditorHandle, EditorQuery};
pub use markup::{looks_like_html, render_fragment, text_view};
pub use persist::{ensure_session_dir, AtomicFileWriter, PersistError};
pub use runner::{run_insertion, NullObserver, RunContext, RunObserver, RunOutcome, RunSettings};
pub use session_store::{
    slot_name, Checkpointer, Clock, LoadOutcome, NoCheckpoint, SessionError, SessionStore,
    SessionWriter,
};
pub use store::{FileRecordStore, MemoryRecordStore, RecordStore};
pub use strategy::{
    CancelFlag, CommitSink, InsertionStrategy, StrategyConfigError, StrategyContext,
    StrategySettings, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE, DEFAULT_TYPE_DELAY, INTERRUPTED,
};
pub use verify::{expected_text, verify_editor};
