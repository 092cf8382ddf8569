//! Byte encodings of a [`SessionRecord`]: plain JSON, or a password-sealed
//! envelope (PBKDF2-HMAC-SHA256 key derivation, AES-256-GCM).

use std::num::NonZeroU32;
use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use typer_core::{InsertionMethod, SessionRecord};

pub const SEALED_FORMAT: &str = "tinytyper-sealed-v1";
pub const KDF_NAME: &str = "pbkdf2-hmac-sha256";
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;
const MAX_KDF_ITERATIONS: u32 = 10_000_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("session record is malformed: {0}")]
    Malformed(String),
    #[error("session record is encrypted and needs a password")]
    PasswordRequired,
    #[error("wrong password or corrupted session record")]
    WrongPassword,
    #[error("encryption failed: {0}")]
    Crypto(String),
}

pub trait RecordCodec {
    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<SessionRecord, CodecError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    url: String,
    #[serde(default)]
    files: Vec<String>,
    fingerprint: String,
    offset: usize,
    method: Option<String>,
    timestamp: String,
    #[serde(default)]
    encrypted: bool,
}

impl PersistedSession {
    fn from_record(record: &SessionRecord, encrypted: bool) -> Self {
        Self {
            url: record.url.clone(),
            files: record.files.clone(),
            fingerprint: record.fingerprint.clone(),
            offset: record.offset,
            method: record.method.map(|m| m.as_str().to_string()),
            timestamp: record.timestamp.clone(),
            encrypted,
        }
    }

    fn into_record(self) -> Result<SessionRecord, CodecError> {
        let method = match self.method.as_deref() {
            None => None,
            Some(raw) => Some(
                InsertionMethod::parse(raw)
                    .ok_or_else(|| CodecError::Malformed(format!("unknown method {raw:?}")))?,
            ),
        };
        Ok(SessionRecord {
            url: self.url,
            files: self.files,
            fingerprint: self.fingerprint,
            offset: self.offset,
            method,
            timestamp: self.timestamp,
            encrypted: self.encrypted,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SealedEnvelope {
    format: String,
    kdf: String,
    iterations: u32,
    salt: String,
    nonce: String,
    ciphertext: String,
}

/// Whether `bytes` hold a sealed envelope rather than a plain record.
pub fn is_sealed(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(bytes)
        .ok()
        .and_then(|v| v.get("format").and_then(|f| f.as_str()).map(|f| f == SEALED_FORMAT))
        .unwrap_or(false)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCodec;

impl RecordCodec for PlainCodec {
    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(&PersistedSession::from_record(record, false))
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SessionRecord, CodecError> {
        if is_sealed(bytes) {
            return Err(CodecError::PasswordRequired);
        }
        decode_plain(bytes)
    }
}

fn decode_plain(bytes: &[u8]) -> Result<SessionRecord, CodecError> {
    let persisted: PersistedSession =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    persisted.into_record()
}

/// Seals with one key per codec: the salt is drawn and the key derived on the
/// first encode, after which every encode only draws a fresh nonce.
pub struct SealedCodec {
    password: String,
    iterations: NonZeroU32,
    rng: SystemRandom,
    sealing: OnceLock<SealingKey>,
}

struct SealingKey {
    salt: [u8; SALT_LEN],
    iterations: NonZeroU32,
    key: LessSafeKey,
}

impl SealedCodec {
    pub fn new(password: impl Into<String>) -> Self {
        Self::with_iterations(password, DEFAULT_KDF_ITERATIONS)
    }

    pub fn with_iterations(password: impl Into<String>, iterations: u32) -> Self {
        Self {
            password: password.into(),
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
            sealing: OnceLock::new(),
        }
    }

    fn derive(&self, salt: &[u8], iterations: NonZeroU32) -> Result<LessSafeKey, CodecError> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            salt,
            self.password.as_bytes(),
            &mut key,
        );
        let unbound = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| CodecError::Crypto("invalid key length".into()))?;
        Ok(LessSafeKey::new(unbound))
    }

    fn sealing_key(&self) -> Result<&SealingKey, CodecError> {
        if let Some(sealing) = self.sealing.get() {
            return Ok(sealing);
        }
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| random_unavailable())?;
        let key = self.derive(&salt, self.iterations)?;
        Ok(self.sealing.get_or_init(|| SealingKey {
            salt,
            iterations: self.iterations,
            key,
        }))
    }
}

impl RecordCodec for SealedCodec {
    fn encode(&self, record: &SessionRecord) -> Result<Vec<u8>, CodecError> {
        let plaintext = serde_json::to_vec(&PersistedSession::from_record(record, true))
            .map_err(|e| CodecError::Malformed(e.to_string()))?;

        let sealing = self.sealing_key()?;
        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce).map_err(|_| random_unavailable())?;

        let mut in_out = plaintext;
        sealing
            .key
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Crypto("seal failed".into()))?;

        let envelope = SealedEnvelope {
            format: SEALED_FORMAT.to_string(),
            kdf: KDF_NAME.to_string(),
            iterations: sealing.iterations.get(),
            salt: BASE64.encode(sealing.salt),
            nonce: BASE64.encode(nonce),
            ciphertext: BASE64.encode(&in_out),
        };
        serde_json::to_vec_pretty(&envelope).map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<SessionRecord, CodecError> {
        if !is_sealed(bytes) {
            // Sessions saved before --encrypt was turned on are still usable;
            // the next save seals them.
            return decode_plain(bytes);
        }
        let envelope: SealedEnvelope =
            serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
        if envelope.kdf != KDF_NAME {
            return Err(CodecError::Malformed(format!("unsupported kdf {}", envelope.kdf)));
        }
        let iterations = NonZeroU32::new(envelope.iterations)
            .filter(|n| n.get() <= MAX_KDF_ITERATIONS)
            .ok_or_else(|| CodecError::Malformed("iteration count out of range".into()))?;

        let salt = decode_b64("salt", &envelope.salt)?;
        let nonce: [u8; NONCE_LEN] = decode_b64("nonce", &envelope.nonce)?
            .try_into()
            .map_err(|_| CodecError::Malformed("nonce has wrong length".into()))?;
        let mut in_out = decode_b64("ciphertext", &envelope.ciphertext)?;

        let derived;
        let key = match self.sealing.get() {
            Some(sealing) if sealing.salt[..] == salt[..] && sealing.iterations == iterations => {
                &sealing.key
            }
            _ => {
                derived = self.derive(&salt, iterations)?;
                &derived
            }
        };
        let plaintext = key
            .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::WrongPassword)?;
        decode_plain(plaintext)
    }
}

fn random_unavailable() -> CodecError {
    CodecError::Crypto("system random source unavailable".into())
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, CodecError> {
    BASE64
        .decode(value)
        .map_err(|e| CodecError::Malformed(format!("{field}: {e}")))
}
