//! Bulk input parsing for pasted batches (URL lists, recipient lists).
//!
//! Contract:
//! - URL batches split on newlines (`\n`, with a trailing `\r` trimmed away);
//!   email batches split on commas. The two delimiters are deliberate.
//! - Each entry is trimmed; entries that trim to nothing are dropped.
//! - Surviving entries are `valid = true`. Syntax checks are a separate,
//!   optional layer (`validate_formats`) chosen by the caller.
//! - Order is preserved and duplicates are kept.
//! - Never fails; the worst case is an empty vector.
//!
//! Logging policy: pasted content is never logged, only counts.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Url,
    Email,
}

impl ItemKind {
    pub const fn delimiter(self) -> char {
        match self {
            ItemKind::Url => '\n',
            ItemKind::Email => ',',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    /// The entry exactly as it appeared between delimiters.
    pub original: String,
    pub value: String,
    pub valid: bool,
}

/// Outcome counts for a parsed batch. `skipped` counts entries that failed the
/// optional format check (soft parse errors); they never abort the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub accepted: usize,
    pub skipped: usize,
}

impl ParseSummary {
    pub fn of(entries: &[ValidatedEntry]) -> Self {
        let accepted = entries.iter().filter(|e| e.valid).count();
        Self {
            accepted,
            skipped: entries.len() - accepted,
        }
    }

    pub fn merge(self, other: ParseSummary) -> Self {
        Self {
            accepted: self.accepted + other.accepted,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// Split `raw` according to `kind` and apply line hygiene.
pub fn parse(raw: &str, kind: ItemKind) -> Vec<ValidatedEntry> {
    let entries: Vec<ValidatedEntry> = raw
        .split(kind.delimiter())
        .filter_map(|piece| {
            let value = piece.trim();
            (!value.is_empty()).then(|| ValidatedEntry {
                original: piece.to_string(),
                value: value.to_string(),
                valid: true,
            })
        })
        .collect();
    debug!(
        target: "text.bulk",
        kind = ?kind,
        raw_len = raw.len(),
        entries = entries.len(),
        "batch_parsed"
    );
    entries
}

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)https?://[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)*(?::\d{1,5})?(?:[/?#]\S*)?$")
        .expect("url pattern compiles")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@,]+@[^\s@,]+\.[^\s@,]+$").expect("email pattern compiles")
});

/// Syntactic check for a single trimmed entry.
fn is_well_formed(value: &str, kind: ItemKind) -> bool {
    match kind {
        ItemKind::Url => URL_RE.is_match(value),
        ItemKind::Email => EMAIL_RE.is_match(value),
    }
}

/// Layer the optional format check over parsed entries, flipping `valid` on
/// entries that fail it. Returns the resulting summary.
pub fn validate_formats(entries: &mut [ValidatedEntry], kind: ItemKind) -> ParseSummary {
    for entry in entries.iter_mut() {
        entry.valid = is_well_formed(&entry.value, kind);
    }
    let summary = ParseSummary::of(entries);
    if summary.skipped > 0 {
        debug!(
            target: "text.bulk",
            kind = ?kind,
            accepted = summary.accepted,
            skipped = summary.skipped,
            "batch_entries_skipped"
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: &[ValidatedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.value.as_str()).collect()
    }

    #[test]
    fn url_batches_split_on_newlines_only() {
        let raw = "https://a.example/x,y\r\n\n  https://b.example  \n";
        let entries = parse(raw, ItemKind::Url);
        assert_eq!(values(&entries), ["https://a.example/x,y", "https://b.example"]);
        assert_eq!(entries[1].original, "  https://b.example  ");
        assert!(entries.iter().all(|e| e.valid));
    }

    #[test]
    fn email_batches_keep_duplicates_in_order() {
        let entries = parse("b@y.com,a@x.com, b@y.com", ItemKind::Email);
        assert_eq!(values(&entries), ["b@y.com", "a@x.com", "b@y.com"]);
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        assert!(parse("", ItemKind::Email).is_empty());
        assert!(parse(" ,\t, \n", ItemKind::Email).is_empty());
        assert!(parse("\n\n   \r\n", ItemKind::Url).is_empty());
    }

    #[test]
    fn format_check_marks_invalid_entries_without_dropping() {
        let mut entries = parse("a@x.com, not-an-email, c@z.org", ItemKind::Email);
        let summary = validate_formats(&mut entries, ItemKind::Email);
        assert_eq!(summary, ParseSummary { accepted: 2, skipped: 1 });
        assert_eq!(entries.len(), 3);
        assert!(!entries[1].valid);
    }

    #[test]
    fn url_format_check() {
        assert!(is_well_formed("https://www.amazon.com/dp/B08N5WRWNW", ItemKind::Url));
        assert!(is_well_formed("http://localhost:8080/", ItemKind::Url));
        assert!(!is_well_formed("ftp://example.com", ItemKind::Url));
        assert!(!is_well_formed("www.example.com", ItemKind::Url));
        assert!(!is_well_formed("https://", ItemKind::Url));
    }

    #[test]
    fn summary_merge_adds_counts() {
        let a = ParseSummary { accepted: 2, skipped: 1 };
        let b = ParseSummary { accepted: 3, skipped: 0 };
        assert_eq!(a.merge(b), ParseSummary { accepted: 5, skipped: 1 });
    }
}
