use crate::{InsertionMethod, RunPhase, VerificationResult};

/// Snapshot of a run for display and exit-status decisions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunView {
    pub phase: RunPhase,
    pub offset: usize,
    pub start_offset: usize,
    pub total_len: usize,
    pub method_used: Option<InsertionMethod>,
    pub attempt_count: usize,
    pub verification: Option<VerificationResult>,
}

impl RunView {
    pub fn committed_this_run(&self) -> usize {
        self.offset.saturating_sub(self.start_offset)
    }
}
