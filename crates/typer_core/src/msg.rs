#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Start inserting at the resolved offset (0 or the resumed one).
    Begin { offset: usize },
    /// A strategy confirmed content up to this absolute offset.
    Committed { offset: usize },
    /// A strategy attempt returned.
    AttemptFinished(crate::InsertionAttemptResult),
    /// Read-back comparison finished.
    VerificationFinished(crate::VerificationResult),
    /// Read-back could not be performed (driver error).
    VerificationUnavailable { detail: String },
    /// Operator interrupt.
    Interrupted,
}
