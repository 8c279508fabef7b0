//! Character-offset string helpers
//!
//! Selection offsets count characters, not bytes. Every helper clamps
//! out-of-range offsets instead of panicking.

/// Number of characters in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `char_idx`-th character, clamped to the end of the string
fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Characters in `[start, end)`, clamped to the string
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start = byte_index(text, start);
    let end = byte_index(text, end).max(start);
    &text[start..end]
}

/// Characters before `idx`
pub fn chars_before(text: &str, idx: usize) -> &str {
    &text[..byte_index(text, idx)]
}

/// Characters from `idx` onwards
pub fn chars_from(text: &str, idx: usize) -> &str {
    &text[byte_index(text, idx)..]
}

/// First `n` characters
pub fn head(text: &str, n: usize) -> &str {
    chars_before(text, n)
}

/// Last `n` characters
pub fn tail(text: &str, n: usize) -> &str {
    let len = char_len(text);
    chars_from(text, len.saturating_sub(n))
}

/// `text[..start] + insert + text[end..]`, offsets in characters
pub fn splice(text: &str, start: usize, end: usize, insert: &str) -> String {
    let start_b = byte_index(text, start);
    let end_b = byte_index(text, end).max(start_b);
    let mut out = String::with_capacity(text.len() - (end_b - start_b) + insert.len());
    out.push_str(&text[..start_b]);
    out.push_str(insert);
    out.push_str(&text[end_b..]);
    out
}
