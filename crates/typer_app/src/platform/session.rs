use typer_core::{resolve_start, FreshReason, SessionKey, SessionRecord, StartDecision};
use typer_engine::{
    Clock, LoadOutcome, PersistError, RecordStore, SessionStore, SessionWriter,
};
use typer_logging::{typer_info, typer_warn};

use super::prompt::Prompter;
use crate::config::SessionOptions;

/// Password prompts before an encrypted record is given up on.
pub const PASSWORD_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum SessionSetupError {
    #[error("saved session for {url} is unreadable ({detail}); rerun with --reset to discard it")]
    Corrupt { url: String, detail: String },
    #[error("could not unlock the saved session after {0} attempt(s); the record was left in place")]
    Locked(usize),
    #[error("--encrypt needs a non-empty password")]
    PasswordMissing,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Where the run starts and who records its progress.
pub struct SessionPlan<S> {
    pub decision: StartDecision,
    /// `None` with `--no-session`.
    pub writer: Option<SessionWriter<S>>,
}

impl<S> SessionPlan<S> {
    pub fn start_offset(&self) -> usize {
        self.decision.offset()
    }
}

pub struct SessionSetup<'a> {
    pub key: &'a SessionKey,
    pub files: Vec<String>,
    pub total_len: usize,
    pub options: &'a SessionOptions,
    pub clock: Clock,
}

pub fn prepare_session<S: RecordStore>(
    store: SessionStore<S>,
    setup: SessionSetup<'_>,
    prompter: &mut dyn Prompter,
) -> Result<SessionPlan<S>, SessionSetupError> {
    let SessionSetup {
        key,
        files,
        total_len,
        options,
        clock,
    } = setup;

    if !options.enabled {
        typer_info!("Session persistence disabled");
        return Ok(SessionPlan {
            decision: resolve_start(None, key, total_len, false),
            writer: None,
        });
    }

    if options.reset {
        store.reset(key)?;
        println!("Saved progress discarded; starting from the beginning");
        let password = if options.encrypt {
            Some(new_password(prompter)?)
        } else {
            None
        };
        return Ok(SessionPlan {
            decision: resolve_start(None, key, total_len, true),
            writer: Some(SessionWriter::new(store, key, files, password, clock)),
        });
    }

    let (stored, mut password) = unlock(&store, key, prompter)?;
    let mut decision = resolve_start(stored.as_ref(), key, total_len, false);
    match &decision {
        StartDecision::Resume {
            offset, saved_at, ..
        } => {
            println!("Found saved session from {saved_at}");
            let question =
                format!("Resume from saved progress at character {offset} of {total_len}?");
            if !prompter.confirm(&question) {
                decision = StartDecision::Fresh {
                    reason: FreshReason::Declined,
                };
            }
        }
        StartDecision::Fresh {
            reason: FreshReason::ContentChanged,
        } => {
            println!("Input changed since the saved session; starting from the beginning");
        }
        StartDecision::Fresh { reason } => {
            typer_info!("Starting fresh ({reason:?})");
        }
    }

    if password.is_none() && options.encrypt {
        password = Some(new_password(prompter)?);
    }

    Ok(SessionPlan {
        decision,
        writer: Some(SessionWriter::new(store, key, files, password, clock)),
    })
}

/// Load the record for `key`, asking for the password when it is sealed.
/// Returns the password that opened it so later checkpoints stay sealed.
fn unlock<S: RecordStore>(
    store: &SessionStore<S>,
    key: &SessionKey,
    prompter: &mut dyn Prompter,
) -> Result<(Option<SessionRecord>, Option<String>), SessionSetupError> {
    let mut password: Option<String> = None;
    let mut attempts = 0;
    loop {
        match store.load(key, password.as_deref())? {
            LoadOutcome::Missing => return Ok((None, password)),
            LoadOutcome::Found(record) | LoadOutcome::Stale(record) => {
                return Ok((Some(record), password));
            }
            LoadOutcome::Malformed(detail) => {
                return Err(SessionSetupError::Corrupt {
                    url: key.url.clone(),
                    detail,
                });
            }
            outcome @ (LoadOutcome::PasswordRequired | LoadOutcome::WrongPassword) => {
                if outcome == LoadOutcome::WrongPassword {
                    println!("Decryption failed. Incorrect password or corrupted file.");
                    typer_warn!("Wrong password for session {} (attempt {attempts})", key.url);
                }
                if attempts == PASSWORD_ATTEMPTS {
                    return Err(SessionSetupError::Locked(attempts));
                }
                attempts += 1;
                let Some(entered) = prompter.password("Session is encrypted. Enter password: ")
                else {
                    return Err(SessionSetupError::Locked(attempts));
                };
                password = Some(entered);
            }
        }
    }
}

fn new_password(prompter: &mut dyn Prompter) -> Result<String, SessionSetupError> {
    for _ in 0..PASSWORD_ATTEMPTS {
        let Some(first) = prompter.password("Enter password for session encryption: ") else {
            break;
        };
        if first.is_empty() {
            println!("Password must not be empty");
            continue;
        }
        match prompter.password("Repeat password: ") {
            Some(second) if second == first => return Ok(first),
            Some(_) => println!("Passwords do not match"),
            None => break,
        }
    }
    Err(SessionSetupError::PasswordMissing)
}
