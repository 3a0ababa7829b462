//! Provider classifiers and the dispatch order.
//!
//! Each provider implements a two-step contract: a cheap case-insensitive
//! keyword pre-filter (`matches`) and field extraction (`parse`). Keyword
//! sets overlap across providers on purpose — generic payment phrasing is
//! shared vocabulary — so the dispatch order below is a load-bearing
//! contract, not an implementation detail: the first parser to claim a
//! body wins.

pub mod apple;
pub mod cashapp;
pub mod other;
pub mod venmo;
pub mod zelle;

pub use apple::AppleCashParser;
pub use cashapp::CashAppParser;
pub use other::OtherParser;
pub use venmo::VenmoParser;
pub use zelle::ZelleParser;

use tracing::debug;

use crate::extract::{UNKNOWN_SENDER, extract_amount, extract_sender, extract_timestamp};
use crate::record::{PaymentCandidate, Provider};

/// Two-step provider contract: keyword pre-filter, then field extraction.
pub trait ProviderParser: Send + Sync {
    fn provider(&self) -> Provider;

    /// Canonical keyword list for this provider. One list per provider;
    /// there are no per-deployment variants.
    fn keywords(&self) -> &'static [&'static str];

    /// Cheap pre-filter: case-insensitive substring test. Passing it does
    /// not guarantee full field extraction.
    fn matches(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }

    /// Extract a candidate once the pre-filter has passed. Missing fields
    /// become sentinels or explicit absences — they never abort the match.
    fn parse(&self, text: &str) -> Option<PaymentCandidate> {
        if !self.matches(text) {
            return None;
        }
        Some(PaymentCandidate {
            provider: self.provider(),
            amount: extract_amount(text),
            sender: extract_sender(text).unwrap_or_else(|| UNKNOWN_SENDER.to_string()),
            timestamp: extract_timestamp(text),
        })
    }
}

/// Fixed dispatch order. Zelle through Apple Cash are brand-anchored;
/// `Other` is the broad catch-all and must stay last.
static PARSERS: [&(dyn ProviderParser); 5] = [
    &ZelleParser,
    &VenmoParser,
    &CashAppParser,
    &AppleCashParser,
    &OtherParser,
];

/// Try each provider in the fixed precedence order and return the first
/// claim. `None` means the body is not a payment notification; that is a
/// drop, not an error.
pub fn classify(text: &str) -> Option<PaymentCandidate> {
    for parser in PARSERS {
        if let Some(candidate) = parser.parse(text) {
            debug!(provider = %candidate.provider, "Classified payment message");
            return Some(candidate);
        }
    }
    None
}
