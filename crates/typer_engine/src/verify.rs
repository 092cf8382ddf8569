use typer_core::{compare, VerificationResult};
use typer_logging::{typer_info, typer_warn};

use crate::editor::{DriverError, EditorDriver, EditorHandle};
use crate::markup::{looks_like_html, text_view};

/// What the editor should show once `content` is fully inserted.
pub fn expected_text(content: &str, formatted: bool) -> String {
    if formatted && looks_like_html(content) {
        text_view(content)
    } else {
        content.to_string()
    }
}

/// Read the editor back and compare it with `expected`.
pub fn verify_editor(
    driver: &mut dyn EditorDriver,
    handle: &EditorHandle,
    expected: &str,
) -> Result<VerificationResult, DriverError> {
    let actual = driver.read_current_content(handle)?;
    let result = compare(expected, &actual);
    match &result.divergence {
        None => typer_info!(
            "Verification {}: {} expected, {} in editor",
            result.verdict.as_str(),
            result.expected_len,
            result.actual_len
        ),
        Some(divergence) => typer_warn!(
            "Verification {} at character {}: expected {:?}, editor has {:?}",
            result.verdict.as_str(),
            divergence.position,
            divergence.expected_context,
            divergence.actual_context
        ),
    }
    Ok(result)
}
