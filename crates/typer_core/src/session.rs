use url::Url;

use crate::InsertionMethod;

/// Normalize a target URL so cosmetic variants map to the same session:
/// lowercase scheme/host (via `Url`), no fragment, no trailing slash on a
/// non-root path. Unparseable input is only trimmed.
pub fn normalize_target_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            let path = url.path().to_string();
            if path.len() > 1 && path.ends_with('/') {
                url.set_path(&path[..path.len() - 1]);
            }
            url.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub url: String,
    pub fingerprint: String,
}

impl SessionKey {
    pub fn new(url: &str, fingerprint: impl Into<String>) -> Self {
        Self {
            url: normalize_target_url(url),
            fingerprint: fingerprint.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub url: String,
    pub files: Vec<String>,
    pub fingerprint: String,
    pub offset: usize,
    pub method: Option<InsertionMethod>,
    pub timestamp: String,
    pub encrypted: bool,
}

impl SessionRecord {
    pub fn new(key: &SessionKey, files: Vec<String>, timestamp: impl Into<String>) -> Self {
        Self {
            url: key.url.clone(),
            files,
            fingerprint: key.fingerprint.clone(),
            offset: 0,
            method: None,
            timestamp: timestamp.into(),
            encrypted: false,
        }
    }

    pub fn belongs_to(&self, key: &SessionKey) -> bool {
        normalize_target_url(&self.url) == key.url && self.fingerprint == key.fingerprint
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshReason {
    NoRecord,
    ResetRequested,
    ContentChanged,
    NothingCommitted,
    OffsetOutOfRange,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDecision {
    Fresh {
        reason: FreshReason,
    },
    Resume {
        offset: usize,
        method: Option<InsertionMethod>,
        saved_at: String,
    },
}

impl StartDecision {
    pub fn offset(&self) -> usize {
        match self {
            StartDecision::Fresh { .. } => 0,
            StartDecision::Resume { offset, .. } => *offset,
        }
    }
}

/// Decide where a run starts. A record is only resumed when it belongs to
/// `key` (same URL and fingerprint) and its offset fits the payload.
pub fn resolve_start(
    stored: Option<&SessionRecord>,
    key: &SessionKey,
    total_len: usize,
    reset: bool,
) -> StartDecision {
    if reset {
        return StartDecision::Fresh {
            reason: FreshReason::ResetRequested,
        };
    }
    let Some(record) = stored else {
        return StartDecision::Fresh {
            reason: FreshReason::NoRecord,
        };
    };
    if !record.belongs_to(key) {
        return StartDecision::Fresh {
            reason: FreshReason::ContentChanged,
        };
    }
    if record.offset > total_len {
        return StartDecision::Fresh {
            reason: FreshReason::OffsetOutOfRange,
        };
    }
    if record.offset == 0 {
        return StartDecision::Fresh {
            reason: FreshReason::NothingCommitted,
        };
    }
    StartDecision::Resume {
        offset: record.offset,
        method: record.method,
        saved_at: record.timestamp.clone(),
    }
}
