//! Cash App notification parser.

use super::ProviderParser;
use crate::record::Provider;

/// Both brand spellings occur in the wild; "sent you money" is the
/// standing phrase of Cash App transfer copy.
const KEYWORDS: &[&str] = &["cash app", "cashapp", "sent you money"];

pub struct CashAppParser;

impl ProviderParser for CashAppParser {
    fn provider(&self) -> Provider {
        Provider::CashApp
    }

    fn keywords(&self) -> &'static [&'static str] {
        KEYWORDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::TimestampField;

    #[test]
    fn parses_transfer_notice() {
        let body = "You received $18.25 from Jane Roe. Jane Roe sent you money using Cash App.";
        let c = CashAppParser.parse(body).expect("keyword match");
        assert_eq!(c.provider, Provider::CashApp);
        assert_eq!(c.amount.as_deref(), Some("$18.25"));
        assert_eq!(c.sender, "Jane Roe");
    }

    #[test]
    fn matches_either_brand_spelling() {
        assert!(CashAppParser.matches("Pending CashApp deposit"));
        assert!(CashAppParser.matches("cash app payment confirmed"));
    }

    #[test]
    fn missing_amount_yields_candidate_with_sentinels() {
        let c = CashAppParser
            .parse("Riley Chen sent you money using Cash App.")
            .expect("keyword match");
        assert_eq!(c.amount, None);
        assert_eq!(c.sender, "Riley Chen");
        assert_eq!(c.timestamp, TimestampField::Absent);
    }

    #[test]
    fn keyword_miss_returns_none() {
        assert_eq!(CashAppParser.parse("Venmo: John paid you $5.00"), None);
    }
}
