//! Apple Cash notification parser.

use super::ProviderParser;
use crate::record::Provider;

const KEYWORDS: &[&str] = &["apple cash", "apple pay", "apple payment"];

pub struct AppleCashParser;

impl ProviderParser for AppleCashParser {
    fn provider(&self) -> Provider {
        Provider::AppleCash
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }
}
