//! Venmo notification parser.

use super::ProviderParser;
use crate::record::Provider;

/// Venmo copy names the brand or uses its signature "paid you" phrasing.
const KEYWORDS: &[&str] = &["venmo", "paid you"];

pub struct VenmoParser;

impl ProviderParser for VenmoParser {
    fn provider(&self) -> Provider {
        Provider::Venmo
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }
}
