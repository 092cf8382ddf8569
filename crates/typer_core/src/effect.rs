use crate::InsertionMethod;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run `method` on the content suffix starting at `offset`.
    Attempt {
        method: InsertionMethod,
        offset: usize,
    },
    /// Persist the committed offset.
    Checkpoint {
        offset: usize,
        method: Option<InsertionMethod>,
    },
    ReportProgress { offset: usize },
    /// Read back the editor and compare.
    Verify,
    Abort { reason: AbortReason },
    /// Interrupted; exit after the checkpoint.
    Stop,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    NoStrategies,
    StrategiesExhausted { offset: usize },
}
