use std::sync::Arc;

use typer_core::{InsertionMethod, SessionKey, SessionRecord};
use typer_logging::{typer_debug, typer_info, typer_warn};

use crate::codec::{CodecError, PlainCodec, RecordCodec, SealedCodec};
use crate::content::fingerprint;
use crate::persist::PersistError;
use crate::store::RecordStore;

/// Produces the timestamp stored with each checkpoint.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

const SLOT_HASH_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// What a session lookup found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Missing,
    Malformed(String),
    PasswordRequired,
    WrongPassword,
    /// Same URL, different content fingerprint.
    Stale(SessionRecord),
    Found(SessionRecord),
}

/// Slot name for a normalized target URL: `session-<16 hex chars>.json`.
pub fn slot_name(url: &str) -> String {
    let hash = fingerprint(url);
    format!("session-{}.json", &hash[..SLOT_HASH_LEN])
}

pub struct SessionStore<S> {
    store: S,
}

impl<S: RecordStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self, key: &SessionKey, password: Option<&str>) -> Result<LoadOutcome, PersistError> {
        let slot = slot_name(&key.url);
        let Some(bytes) = self.store.read(&slot)? else {
            typer_debug!("No session record in {slot}");
            return Ok(LoadOutcome::Missing);
        };
        let decoded = match password {
            Some(password) => SealedCodec::new(password).decode(&bytes),
            None => PlainCodec.decode(&bytes),
        };
        let record = match decoded {
            Ok(record) => record,
            Err(CodecError::PasswordRequired) => return Ok(LoadOutcome::PasswordRequired),
            Err(CodecError::WrongPassword) => return Ok(LoadOutcome::WrongPassword),
            Err(CodecError::Malformed(detail)) | Err(CodecError::Crypto(detail)) => {
                typer_warn!("Session record {slot} is unreadable: {detail}");
                return Ok(LoadOutcome::Malformed(detail));
            }
        };
        if typer_core::normalize_target_url(&record.url) != key.url {
            // Slot hash collision with another URL; nothing of ours is stored.
            return Ok(LoadOutcome::Missing);
        }
        if record.fingerprint != key.fingerprint {
            typer_info!("Session record for {} belongs to different content", key.url);
            return Ok(LoadOutcome::Stale(record));
        }
        Ok(LoadOutcome::Found(record))
    }

    /// Write the full record, sealed when `password` is given.
    pub fn save(&self, record: &SessionRecord, password: Option<&str>) -> Result<(), SessionError> {
        match password {
            Some(password) => self.save_with(record, &SealedCodec::new(password)),
            None => self.save_with(record, &PlainCodec),
        }
    }

    pub fn save_with(&self, record: &SessionRecord, codec: &dyn RecordCodec) -> Result<(), SessionError> {
        let bytes = codec.encode(record)?;
        let url = typer_core::normalize_target_url(&record.url);
        self.store.write(&slot_name(&url), &bytes)?;
        Ok(())
    }

    /// Delete whatever is stored for `key`'s URL.
    pub fn reset(&self, key: &SessionKey) -> Result<bool, PersistError> {
        let removed = self.store.remove(&slot_name(&key.url))?;
        if removed {
            typer_info!("Removed session record for {}", key.url);
        }
        Ok(removed)
    }
}

/// Receives durable progress checkpoints during a run.
pub trait Checkpointer {
    fn checkpoint(&mut self, offset: usize, method: Option<InsertionMethod>) -> Result<(), SessionError>;
}

/// Checkpointer used with `--no-session`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoint;

impl Checkpointer for NoCheckpoint {
    fn checkpoint(&mut self, _offset: usize, _method: Option<InsertionMethod>) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Rewrites the session record for one key on every checkpoint. A sealed
/// writer derives its key once and reuses it for the whole run.
pub struct SessionWriter<S> {
    store: SessionStore<S>,
    record: SessionRecord,
    sealer: Option<SealedCodec>,
    clock: Clock,
}

impl<S: RecordStore> SessionWriter<S> {
    pub fn new(
        store: SessionStore<S>,
        key: &SessionKey,
        files: Vec<String>,
        password: Option<String>,
        clock: Clock,
    ) -> Self {
        Self::with_sealer(store, key, files, password.map(SealedCodec::new), clock)
    }

    pub fn with_sealer(
        store: SessionStore<S>,
        key: &SessionKey,
        files: Vec<String>,
        sealer: Option<SealedCodec>,
        clock: Clock,
    ) -> Self {
        let mut record = SessionRecord::new(key, files, clock());
        record.encrypted = sealer.is_some();
        Self {
            store,
            record,
            sealer,
            clock,
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }
}

impl<S: RecordStore> Checkpointer for SessionWriter<S> {
    fn checkpoint(&mut self, offset: usize, method: Option<InsertionMethod>) -> Result<(), SessionError> {
        self.record.offset = offset;
        if method.is_some() {
            self.record.method = method;
        }
        self.record.timestamp = (self.clock)();
        match &self.sealer {
            Some(sealer) => self.store.save_with(&self.record, sealer)?,
            None => self.store.save_with(&self.record, &PlainCodec)?,
        }
        typer_debug!("Checkpoint at offset {offset}");
        Ok(())
    }
}
