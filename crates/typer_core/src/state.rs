use std::collections::VecDeque;

use crate::view_model::RunView;
use crate::{FallbackPolicy, InsertionAttemptResult, InsertionMethod, VerificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Inserting {
        method: InsertionMethod,
    },
    Verifying,
    Completed,
    Interrupted,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Interrupted | RunPhase::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    total_len: usize,
    offset: usize,
    start_offset: usize,
    attempt_start: usize,
    pending: VecDeque<InsertionMethod>,
    phase: RunPhase,
    method_used: Option<InsertionMethod>,
    attempts: Vec<InsertionAttemptResult>,
    verify: bool,
    verification: Option<VerificationResult>,
}

impl RunState {
    pub fn new(total_len: usize, policy: FallbackPolicy, verify: bool) -> Self {
        Self {
            total_len,
            pending: policy.order().into(),
            verify,
            ..Self::default()
        }
    }

    pub fn view(&self) -> RunView {
        RunView {
            phase: self.phase,
            offset: self.offset,
            start_offset: self.start_offset,
            total_len: self.total_len,
            method_used: self.method_used,
            attempt_count: self.attempts.len(),
            verification: self.verification.clone(),
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn method_used(&self) -> Option<InsertionMethod> {
        self.method_used
    }

    pub fn attempts(&self) -> &[InsertionAttemptResult] {
        &self.attempts
    }

    pub(crate) fn begin(&mut self, offset: usize) {
        let offset = offset.min(self.total_len);
        self.offset = offset;
        self.start_offset = offset;
        self.attempt_start = offset;
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.offset >= self.total_len
    }

    pub(crate) fn attempt_start(&self) -> usize {
        self.attempt_start
    }

    /// Move the committed offset forward. Offsets behind the current one are
    /// ignored and offsets past the end are clamped. Returns whether the
    /// offset changed.
    pub(crate) fn advance(&mut self, offset: usize, method: InsertionMethod) -> bool {
        let offset = offset.min(self.total_len);
        if offset <= self.offset {
            return false;
        }
        self.offset = offset;
        self.method_used = Some(method);
        true
    }

    pub(crate) fn start_attempt(&mut self, method: InsertionMethod) {
        self.attempt_start = self.offset;
        self.phase = RunPhase::Inserting { method };
    }

    pub(crate) fn next_method(&mut self) -> Option<InsertionMethod> {
        self.pending.pop_front()
    }

    pub(crate) fn record_attempt(&mut self, result: InsertionAttemptResult) {
        self.attempts.push(result);
    }

    pub(crate) fn wants_verification(&self) -> bool {
        self.verify
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_verification(&mut self, result: VerificationResult) {
        self.verification = Some(result);
    }
}
