//! Canonical payment records — identity keys and display rendering.
//!
//! A [`PaymentCandidate`] is what a provider parser produces from one
//! message body. The record builder derives the stable dedup key
//! (fingerprint) and the exact notification text from it; both are
//! deterministic functions of the candidate, so the same real-world
//! payment always collapses onto the same row.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::extract::{TimestampField, home_offset};

/// Rendered in place of a missing amount or timestamp.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Joins fingerprint components. Must not occur in any field: sender
/// names and raw timestamp text come from character classes without it,
/// and amounts are `$`, digits, commas, and a period.
const FINGERPRINT_SEPARATOR: char = '|';

/// Peer-payment provider a message was attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Zelle,
    Venmo,
    CashApp,
    AppleCash,
    /// Catch-all for payment-shaped messages no named provider claimed.
    Other,
}

impl Provider {
    /// Display name, as used in notification text and persisted rows.
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Zelle => "Zelle",
            Provider::Venmo => "Venmo",
            Provider::CashApp => "Cash App",
            Provider::AppleCash => "Apple Cash",
            Provider::Other => "Other",
        }
    }

    /// Parse a persisted provider name. Unrecognized names fold into
    /// `Other` rather than failing a whole row read.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Zelle" => Provider::Zelle,
            "Venmo" => Provider::Venmo,
            "Cash App" => Provider::CashApp,
            "Apple Cash" => Provider::AppleCash,
            _ => Provider::Other,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A provisionally-parsed payment, before dedup and persistence.
///
/// Immutable once constructed. Fields may carry sentinel/absent values —
/// partial extraction is a lower-confidence record, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCandidate {
    pub provider: Provider,
    /// Canonical display string (`$45.00`), `None` when no amount matched.
    pub amount: Option<String>,
    /// Always printable; parsers substitute `"Unknown Sender"` on a miss.
    pub sender: String,
    pub timestamp: TimestampField,
}

impl PaymentCandidate {
    /// Amount as rendered in the notification text.
    pub fn amount_label(&self) -> &str {
        self.amount.as_deref().unwrap_or(UNKNOWN_FIELD)
    }

    /// Timestamp as rendered in the notification text: instants in the
    /// fixed UTC−8 offset as `YYYY-MM-DD hh:mm AM/PM`, raw matched text
    /// verbatim, absent as `Unknown`.
    pub fn timestamp_label(&self) -> String {
        match &self.timestamp {
            TimestampField::Matched(instant) => instant
                .with_timezone(&home_offset())
                .format("%Y-%m-%d %I:%M %p")
                .to_string(),
            TimestampField::Unparsed(raw) => raw.clone(),
            TimestampField::Absent => UNKNOWN_FIELD.to_string(),
        }
    }

    /// Stable identity key: `provider|sender|amount|timestamp`.
    pub fn fingerprint(&self) -> String {
        let sep = FINGERPRINT_SEPARATOR;
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.provider.name(),
            self.sender,
            self.amount_label(),
            self.timestamp_label(),
        )
    }

    /// The exact text sent to the notification sink.
    pub fn display_message(&self) -> String {
        format!(
            "*{} Payment Received*\nFrom: {}\nAmount: {}\nTime: {}",
            self.provider.name(),
            self.sender,
            self.amount_label(),
            self.timestamp_label(),
        )
    }
}

/// A persisted, canonical, deduplicated payment. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub fingerprint: String,
    pub provider: Provider,
    pub amount: Option<String>,
    pub sender: String,
    pub timestamp: TimestampField,
    pub display_message: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Build the canonical record for a candidate at insertion time.
    pub fn from_candidate(candidate: &PaymentCandidate, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fingerprint: candidate.fingerprint(),
            provider: candidate.provider,
            amount: candidate.amount.clone(),
            sender: candidate.sender.clone(),
            timestamp: candidate.timestamp.clone(),
            display_message: candidate.display_message(),
            created_at,
        }
    }
}
