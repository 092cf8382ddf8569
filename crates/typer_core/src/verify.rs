/// Characters of context shown on each side of the first divergence.
pub const CONTEXT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    PartialMatch,
    Mismatch,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Match => "match",
            Verdict::PartialMatch => "partial-match",
            Verdict::Mismatch => "mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Character index into the normalized expected text.
    pub position: usize,
    pub expected_context: String,
    pub actual_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub expected_len: usize,
    pub actual_len: usize,
    pub divergence: Option<Divergence>,
    pub verdict: Verdict,
}

impl VerificationResult {
    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Match
    }
}

/// Only the edges are normalized: the editor may add or drop surrounding
/// whitespace when it renders, but internal whitespace is content.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

pub fn compare(expected: &str, actual: &str) -> VerificationResult {
    let expected: Vec<char> = normalize(expected).chars().collect();
    let actual: Vec<char> = normalize(actual).chars().collect();

    let verdict = if expected == actual {
        Verdict::Match
    } else if contains(&actual, &expected) || (!actual.is_empty() && expected.starts_with(&actual))
    {
        Verdict::PartialMatch
    } else {
        Verdict::Mismatch
    };

    let divergence = if verdict == Verdict::Match {
        None
    } else {
        let position = expected
            .iter()
            .zip(actual.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| expected.len().min(actual.len()));
        Some(Divergence {
            position,
            expected_context: window(&expected, position),
            actual_context: window(&actual, position),
        })
    };

    VerificationResult {
        expected_len: expected.len(),
        actual_len: actual.len(),
        divergence,
        verdict,
    }
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn window(text: &[char], position: usize) -> String {
    let start = position.saturating_sub(CONTEXT_WINDOW).min(text.len());
    let end = (position + CONTEXT_WINDOW).min(text.len());
    text[start..end].iter().collect()
}
