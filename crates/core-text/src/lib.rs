//! Text helpers shared by field controllers and batch forms.
//!
//! Cursor positions throughout the workspace are *char* indices into the
//! live buffer (`0 ..= char_len(text)`). Clamping additionally snaps to a
//! grapheme cluster boundary so a shortened buffer never leaves the cursor
//! between a base character and its combining marks.

use unicode_segmentation::UnicodeSegmentation;

pub mod bulk;

pub use bulk::{ItemKind, ParseSummary, ValidatedEntry, parse, validate_formats};

/// Number of chars in `text` (the upper bound for a cursor).
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the char at `char_index`, or `text.len()` past the end.
pub fn byte_index_at_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// Clamp `cursor` into `0 ..= char_len(text)` and snap it back to the start of the
/// grapheme cluster it would otherwise split.
pub fn clamp_cursor(text: &str, cursor: usize) -> usize {
    let len = char_len(text);
    let clamped = cursor.min(len);
    if clamped == len || clamped == 0 {
        return clamped;
    }
    let byte = byte_index_at_char(text, clamped);
    let mut boundary_chars = 0usize;
    for (start, cluster) in text.grapheme_indices(true) {
        if start + cluster.len() > byte {
            if start == byte {
                return clamped;
            }
            return boundary_chars;
        }
        boundary_chars += cluster.chars().count();
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_len_counts_scalar_values() {
        assert_eq!(char_len(""), 0);
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(byte_index_at_char("héllo", 2), 3);
        assert_eq!(byte_index_at_char("héllo", 99), "héllo".len());
    }

    #[test]
    fn clamp_limits_to_length() {
        assert_eq!(clamp_cursor("hi", 10), 2);
        assert_eq!(clamp_cursor("hi", 1), 1);
        assert_eq!(clamp_cursor("", 3), 0);
    }

    #[test]
    fn clamp_snaps_out_of_combining_sequence() {
        // 'e' + combining acute is one cluster spanning chars 1..3
        let text = "ae\u{0301}b";
        assert_eq!(char_len(text), 4);
        assert_eq!(clamp_cursor(text, 2), 1);
        assert_eq!(clamp_cursor(text, 3), 3);
        assert_eq!(clamp_cursor(text, 1), 1);
    }
}
