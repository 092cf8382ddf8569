use std::fmt;

/// Tag of an insertion strategy. The engine owns the handlers; the core only
/// decides which one runs next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertionMethod {
    Clipboard,
    Batch,
    CharByChar,
}

impl InsertionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            InsertionMethod::Clipboard => "clipboard",
            InsertionMethod::Batch => "batch",
            InsertionMethod::CharByChar => "char_by_char",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "clipboard" => Some(InsertionMethod::Clipboard),
            "batch" => Some(InsertionMethod::Batch),
            "char_by_char" => Some(InsertionMethod::CharByChar),
            _ => None,
        }
    }
}

impl fmt::Display for InsertionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator switches that shape the fixed fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub clipboard_enabled: bool,
    pub prefer_batch: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            clipboard_enabled: true,
            prefer_batch: false,
        }
    }
}

impl FallbackPolicy {
    /// Clipboard first (unless disabled), then batch if requested, else
    /// character-by-character.
    pub fn order(&self) -> Vec<InsertionMethod> {
        let mut order = Vec::with_capacity(2);
        if self.clipboard_enabled {
            order.push(InsertionMethod::Clipboard);
        }
        if self.prefer_batch {
            order.push(InsertionMethod::Batch);
        } else {
            order.push(InsertionMethod::CharByChar);
        }
        order
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionAttemptResult {
    /// Characters committed by this attempt, counted from the offset it
    /// started at.
    pub committed: usize,
    pub method: InsertionMethod,
    pub success: bool,
    pub error: Option<String>,
}

impl InsertionAttemptResult {
    pub fn completed(method: InsertionMethod, committed: usize) -> Self {
        Self {
            committed,
            method,
            success: true,
            error: None,
        }
    }

    pub fn failed(method: InsertionMethod, committed: usize, error: impl Into<String>) -> Self {
        Self {
            committed,
            method,
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_round_trip() {
        for method in [
            InsertionMethod::Clipboard,
            InsertionMethod::Batch,
            InsertionMethod::CharByChar,
        ] {
            assert_eq!(InsertionMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(InsertionMethod::parse("typing"), None);
    }
}
