//! Catch-all parser for payment-shaped messages no named provider claimed.

use super::ProviderParser;
use crate::record::Provider;

/// Intentionally broad and overlapping with every named provider, so a
/// payment-shaped message is captured as `Other` rather than silently
/// dropped. This parser must run last.
const KEYWORDS: &[&str] = &[
    "payment",
    "paid you",
    "sent you",
    "you received",
    "received money",
    "money from",
    "transaction",
];

pub struct OtherParser;

impl ProviderParser for OtherParser {
    fn provider(&self) -> Provider {
        Provider::Other
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }
}
