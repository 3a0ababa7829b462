//! Shared field extractors for payment-notification bodies.
//!
//! All five provider parsers run the same three extractors; only the
//! keyword pre-filter differs per provider. A miss is never an error —
//! callers substitute a sentinel (`"Unknown Sender"`) or carry the
//! absence forward explicitly via [`TimestampField`].

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use regex::Regex;

/// Sentinel used when no sender can be extracted. The record must always
/// have a printable sender, never a null-like marker.
pub const UNKNOWN_SENDER: &str = "Unknown Sender";

/// Long-form timestamp layout found in provider notification copy,
/// e.g. `February 3, 2024 1:14 PM`.
const LONG_DATE_FORMAT: &str = "%B %d, %Y %I:%M %p";

/// Fixed civil-time offset for rendering and interpreting provider
/// timestamps (UTC−8, the providers' home region; no DST adjustment).
pub fn home_offset() -> FixedOffset {
    FixedOffset::west_opt(8 * 3600).expect("static offset is in range")
}

/// `$<digits>[,digits]*.<2 digits>` — first match in document order wins.
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([\d,]+\.\d{2})").expect("static regex"));

/// Name after a cue phrase: `from X`, `payment from X`, `money from X`,
/// `received from X`. Also accepts the `From:` shape our own rendering
/// emits. Cue matching is case-insensitive; the name itself must be
/// capitalized tokens so trailing prose ("via", "on February") is not
/// swallowed into the capture.
static SENDER_AFTER_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(?i:payment from|money from|received from|from):?[ \t]+({NAME})"
    ))
    .expect("static regex")
});

/// Name before a cue phrase: `X paid you`, `X sent you`.
static SENDER_BEFORE_CUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({NAME})[ \t]+(?i:paid you|sent you)")).expect("static regex")
});

/// A name: 1–4 capitalized tokens. A token is letters with apostrophes
/// and hyphens, or an abbreviated initial like `Q.` — a period may only
/// end a short token, so a sentence-final period cannot splice two
/// sentences into one capture.
const NAME: &str = r"[A-Z](?:[A-Za-z'-]*|[A-Za-z]?\.)(?: [A-Z](?:[A-Za-z'-]*|[A-Za-z]?\.)){0,3}";

/// Long-form date-time: `Month DD, YYYY HH:MM AM/PM`. The meridiem is
/// optional in the match so that near-misses surface as raw text instead
/// of disappearing.
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([A-Za-z]+ +\d{1,2}, +\d{4} +\d{1,2}:\d{2}(?: ?(?:AM|PM))?)")
        .expect("static regex")
});

/// Outcome of timestamp extraction. The three states are deliberate:
/// a date-shaped string that fails to parse is kept verbatim rather than
/// silently dropped, and "nothing found" is distinct from "unparseable."
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampField {
    /// Matched and parsed into an absolute instant.
    Matched(DateTime<Utc>),
    /// Matched date-shaped text that did not parse; kept raw.
    Unparsed(String),
    /// No timestamp text in the body.
    Absent,
}

impl TimestampField {
    pub fn is_absent(&self) -> bool {
        matches!(self, TimestampField::Absent)
    }
}

/// Extract the first currency amount, normalized back to `$` form.
pub fn extract_amount(text: &str) -> Option<String> {
    AMOUNT_RE.captures(text).map(|c| format!("${}", &c[1]))
}

/// Extract a sender name from natural-language cue phrases.
///
/// Name-after-cue shapes win over name-before-cue shapes when both are
/// present; either way the first occurrence in document order is taken.
pub fn extract_sender(text: &str) -> Option<String> {
    SENDER_AFTER_CUE_RE
        .captures(text)
        .or_else(|| SENDER_BEFORE_CUE_RE.captures(text))
        .map(|c| c[1].trim().to_string())
}

/// Extract and parse a long-form timestamp.
///
/// The matched text is interpreted as civil time in the fixed UTC−8
/// offset and stored as a UTC instant.
pub fn extract_timestamp(text: &str) -> TimestampField {
    let Some(caps) = TIMESTAMP_RE.captures(text) else {
        return TimestampField::Absent;
    };
    let raw = caps[1].to_string();

    match NaiveDateTime::parse_from_str(&raw, LONG_DATE_FORMAT) {
        Ok(naive) => match naive.and_local_timezone(home_offset()).single() {
            Some(local) => TimestampField::Matched(local.with_timezone(&Utc)),
            None => TimestampField::Unparsed(raw),
        },
        Err(_) => TimestampField::Unparsed(raw),
    }
}
