//! Insertion strategies: one handler per [`InsertionMethod`].
//!
//! Every handler receives the suffix still to insert and the absolute offset
//! it starts at, reports each confirmed piece to a [`CommitSink`], and returns
//! an [`InsertionAttemptResult`] counting only what was confirmed.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use typer_core::{char_len, split_chunks, InsertionAttemptResult, InsertionMethod};
use typer_logging::{typer_debug, typer_warn};

use crate::clipboard::Clipboard;
use crate::editor::{EditorDriver, EditorHandle};

/// Error detail of an attempt stopped by the operator.
pub const INTERRUPTED: &str = "interrupted";

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_TYPE_DELAY: Duration = Duration::from_millis(10);

/// Shared cancellation flag, set from the Ctrl-C listener.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receives every absolute offset a strategy confirms.
pub trait CommitSink {
    fn committed(&mut self, offset: usize);
}

impl CommitSink for Vec<usize> {
    fn committed(&mut self, offset: usize) {
        self.push(offset);
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StrategyConfigError {
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("{0} delay must be a finite, non-negative number of seconds")]
    InvalidDelay(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySettings {
    pub batch_size: NonZeroUsize,
    pub batch_delay: Duration,
    pub type_delay: Duration,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            batch_delay: DEFAULT_BATCH_DELAY,
            type_delay: DEFAULT_TYPE_DELAY,
        }
    }
}

impl StrategySettings {
    /// Build from operator values; delays are in seconds.
    pub fn from_operator(
        batch_size: usize,
        batch_delay_secs: f64,
        type_delay_secs: f64,
    ) -> Result<Self, StrategyConfigError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or(StrategyConfigError::ZeroBatchSize)?;
        let batch_delay = Duration::try_from_secs_f64(batch_delay_secs)
            .map_err(|_| StrategyConfigError::InvalidDelay("batch"))?;
        let type_delay = Duration::try_from_secs_f64(type_delay_secs)
            .map_err(|_| StrategyConfigError::InvalidDelay("type"))?;
        Ok(Self {
            batch_size,
            batch_delay,
            type_delay,
        })
    }
}

/// Everything a handler touches besides the text itself.
pub struct StrategyContext<'a> {
    pub driver: &'a mut dyn EditorDriver,
    pub clipboard: &'a mut dyn Clipboard,
    pub handle: &'a EditorHandle,
    pub cancel: &'a CancelFlag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertionStrategy {
    Clipboard,
    Batch { chunk_size: NonZeroUsize, delay: Duration },
    CharByChar { delay: Duration },
}

impl InsertionStrategy {
    pub fn for_method(method: InsertionMethod, settings: &StrategySettings) -> Self {
        match method {
            InsertionMethod::Clipboard => InsertionStrategy::Clipboard,
            InsertionMethod::Batch => InsertionStrategy::Batch {
                chunk_size: settings.batch_size,
                delay: settings.batch_delay,
            },
            InsertionMethod::CharByChar => InsertionStrategy::CharByChar {
                delay: settings.type_delay,
            },
        }
    }

    pub fn method(&self) -> InsertionMethod {
        match self {
            InsertionStrategy::Clipboard => InsertionMethod::Clipboard,
            InsertionStrategy::Batch { .. } => InsertionMethod::Batch,
            InsertionStrategy::CharByChar { .. } => InsertionMethod::CharByChar,
        }
    }

    pub fn run(
        &self,
        ctx: &mut StrategyContext<'_>,
        suffix: &str,
        offset: usize,
        sink: &mut dyn CommitSink,
    ) -> InsertionAttemptResult {
        typer_debug!(
            "{} attempt at offset {offset} ({} characters left)",
            self.method(),
            char_len(suffix)
        );
        match self {
            InsertionStrategy::Clipboard => insert_via_clipboard(ctx, suffix, offset, sink),
            InsertionStrategy::Batch { chunk_size, delay } => {
                insert_in_batches(ctx, suffix, offset, *chunk_size, *delay, sink)
            }
            InsertionStrategy::CharByChar { delay } => {
                insert_char_by_char(ctx, suffix, offset, *delay, sink)
            }
        }
    }
}

fn insert_via_clipboard(
    ctx: &mut StrategyContext<'_>,
    suffix: &str,
    offset: usize,
    sink: &mut dyn CommitSink,
) -> InsertionAttemptResult {
    let method = InsertionMethod::Clipboard;
    if ctx.cancel.is_cancelled() {
        return InsertionAttemptResult::failed(method, 0, INTERRUPTED);
    }
    let saved = match ctx.clipboard.read() {
        Ok(saved) => saved,
        Err(err) => return InsertionAttemptResult::failed(method, 0, err.to_string()),
    };
    let before = match ctx.driver.read_current_content(ctx.handle) {
        Ok(before) => before,
        Err(err) => return InsertionAttemptResult::failed(method, 0, err.to_string()),
    };

    let pasted = paste_suffix(ctx, suffix);

    if let Err(err) = ctx.clipboard.write(&saved) {
        typer_warn!("Could not restore clipboard contents: {err}");
    }

    match pasted {
        Ok(after) if after != before => {
            let len = char_len(suffix);
            sink.committed(offset + len);
            InsertionAttemptResult::completed(method, len)
        }
        Ok(_) => InsertionAttemptResult::failed(method, 0, "editor content unchanged after paste"),
        Err(detail) => InsertionAttemptResult::failed(method, 0, detail),
    }
}

fn paste_suffix(ctx: &mut StrategyContext<'_>, suffix: &str) -> Result<String, String> {
    ctx.clipboard.write(suffix).map_err(|e| e.to_string())?;
    ctx.driver
        .paste_clipboard(ctx.handle)
        .map_err(|e| e.to_string())?;
    ctx.driver
        .read_current_content(ctx.handle)
        .map_err(|e| e.to_string())
}

fn insert_in_batches(
    ctx: &mut StrategyContext<'_>,
    suffix: &str,
    offset: usize,
    chunk_size: NonZeroUsize,
    delay: Duration,
    sink: &mut dyn CommitSink,
) -> InsertionAttemptResult {
    insert_pieces(
        ctx,
        InsertionMethod::Batch,
        split_chunks(suffix, chunk_size),
        offset,
        delay,
        sink,
    )
}

fn insert_char_by_char(
    ctx: &mut StrategyContext<'_>,
    suffix: &str,
    offset: usize,
    delay: Duration,
    sink: &mut dyn CommitSink,
) -> InsertionAttemptResult {
    let chars = suffix
        .char_indices()
        .map(|(idx, ch)| &suffix[idx..idx + ch.len_utf8()]);
    insert_pieces(ctx, InsertionMethod::CharByChar, chars, offset, delay, sink)
}

fn insert_pieces<'s>(
    ctx: &mut StrategyContext<'_>,
    method: InsertionMethod,
    pieces: impl IntoIterator<Item = &'s str>,
    offset: usize,
    delay: Duration,
    sink: &mut dyn CommitSink,
) -> InsertionAttemptResult {
    let mut committed = 0;
    for (idx, piece) in pieces.into_iter().enumerate() {
        if idx > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        if ctx.cancel.is_cancelled() {
            return InsertionAttemptResult::failed(method, committed, INTERRUPTED);
        }
        if let Err(err) = ctx.driver.set_content_fragment(ctx.handle, piece) {
            typer_warn!("{method} insertion stopped at offset {}: {err}", offset + committed);
            return InsertionAttemptResult::failed(method, committed, err.to_string());
        }
        committed += char_len(piece);
        sink.committed(offset + committed);
    }
    InsertionAttemptResult::completed(method, committed)
}
