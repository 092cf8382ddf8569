//! tinytyper core: pure insertion state machine, session decisions, progress
//! arithmetic and text verification. No IO happens here.
mod chunk;
mod effect;
mod method;
mod msg;
mod progress;
mod session;
mod state;
mod update;
mod verify;
mod view_model;

pub use chunk::{char_len, split_chunks, suffix_from};
pub use effect::{AbortReason, Effect};
pub use method::{FallbackPolicy, InsertionAttemptResult, InsertionMethod};
pub use msg::Msg;
pub use progress::{report, Eta, ProgressReport, ProgressSample, ProgressTracker};
pub use session::{
    normalize_target_url, resolve_start, FreshReason, SessionKey, SessionRecord, StartDecision,
};
pub use state::{RunPhase, RunState};
pub use update::update;
pub use verify::{compare, normalize, Divergence, Verdict, VerificationResult, CONTEXT_WINDOW};
pub use view_model::RunView;
