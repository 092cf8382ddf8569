use std::num::NonZeroUsize;

/// Length in characters (Unicode scalar values), the unit every offset uses.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Suffix of `text` starting at character `offset`; empty past the end.
pub fn suffix_from(text: &str, offset: usize) -> &str {
    match text.char_indices().nth(offset) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Split into consecutive slices of at most `size` characters each.
/// Concatenating the result always yields `text` again.
pub fn split_chunks(text: &str, size: NonZeroUsize) -> Vec<&str> {
    let size = size.get();
    let mut chunks = Vec::with_capacity(text.len() / size + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
