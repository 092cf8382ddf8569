use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use typer_core::{char_len, suffix_from};
use typer_logging::{typer_debug, typer_info};

use crate::decode::{decode_text, DecodeError};

pub const DEFAULT_SEPARATOR: &str = "\n\n";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to decode {path}: {source}")]
    Decode { path: PathBuf, source: DecodeError },
    #[error("no input files given")]
    NoInput,
}

/// One input file's place inside the concatenated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub encoding_label: String,
    /// Character offset where this file starts.
    pub start: usize,
    /// Length in characters.
    pub len: usize,
}

impl SourceSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Where a global offset falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePosition {
    /// Inside file `file`, `offset` characters into it.
    File { file: usize, offset: usize },
    /// Inside the separator that follows file `after_file`.
    Separator { after_file: usize, offset: usize },
    End,
}

/// The full text to insert. Immutable once built; offsets are characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPayload {
    text: String,
    len: usize,
    separator: String,
    sources: Vec<SourceSpan>,
    fingerprint: String,
}

impl ContentPayload {
    /// Build from already-decoded parts joined by `separator`.
    pub fn from_parts(parts: Vec<(PathBuf, String, String)>, separator: &str) -> Self {
        let separator_len = char_len(separator);
        let mut text = String::new();
        let mut sources = Vec::with_capacity(parts.len());
        let mut cursor = 0;
        for (idx, (path, encoding_label, part)) in parts.into_iter().enumerate() {
            if idx > 0 {
                text.push_str(separator);
                cursor += separator_len;
            }
            let len = char_len(&part);
            text.push_str(&part);
            sources.push(SourceSpan {
                path,
                encoding_label,
                start: cursor,
                len,
            });
            cursor += len;
        }
        Self::assemble(text, cursor, separator.to_string(), sources)
    }

    /// Payload of inline text with no backing file.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = char_len(&text);
        Self::assemble(text, len, DEFAULT_SEPARATOR.to_string(), Vec::new())
    }

    fn assemble(text: String, len: usize, separator: String, sources: Vec<SourceSpan>) -> Self {
        let fingerprint = fingerprint(&text);
        Self {
            text,
            len,
            separator,
            sources,
            fingerprint,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn sources(&self) -> &[SourceSpan] {
        &self.sources
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .map(|s| s.path.display().to_string())
            .collect()
    }

    pub fn suffix(&self, offset: usize) -> &str {
        suffix_from(&self.text, offset)
    }

    /// Map a global offset back to the file (or separator) it falls in.
    pub fn locate(&self, offset: usize) -> SourcePosition {
        if offset >= self.len {
            return SourcePosition::End;
        }
        for (idx, span) in self.sources.iter().enumerate() {
            if offset < span.end() {
                return SourcePosition::File {
                    file: idx,
                    offset: offset - span.start,
                };
            }
            if let Some(next) = self.sources.get(idx + 1) {
                if offset < next.start {
                    return SourcePosition::Separator {
                        after_file: idx,
                        offset: offset - span.end(),
                    };
                }
            }
        }
        // Inline payloads have no spans; treat them as a single file.
        SourcePosition::File { file: 0, offset }
    }
}

/// Lowercase hex SHA-256 of the concatenated content.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(64);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

/// Load and concatenate `files` in order, joined by `separator`.
pub fn load_content(files: &[PathBuf], separator: &str) -> Result<ContentPayload, ContentError> {
    if files.is_empty() {
        return Err(ContentError::NoInput);
    }
    let mut parts = Vec::with_capacity(files.len());
    for path in files {
        let decoded = read_file(path)?;
        typer_info!(
            "Loaded {:?} ({} characters, {})",
            path,
            char_len(&decoded.text),
            decoded.encoding_label
        );
        parts.push((path.clone(), decoded.encoding_label, decoded.text));
    }
    let payload = ContentPayload::from_parts(parts, separator);
    typer_debug!(
        "Content payload: {} characters from {} files, fingerprint {}",
        payload.len(),
        files.len(),
        payload.fingerprint()
    );
    Ok(payload)
}

fn read_file(path: &Path) -> Result<crate::decode::DecodedText, ContentError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ContentError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ContentError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    decode_text(&bytes).map_err(|source| ContentError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
