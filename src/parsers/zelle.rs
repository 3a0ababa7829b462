//! Zelle notification parser.

use super::ProviderParser;
use crate::record::Provider;

/// Bank-relayed Zelle notices lead with the brand name or the
/// "received money" phrasing; both are unique to Zelle copy among the
/// named providers.
const KEYWORDS: &[&str] = &["zelle", "received money"];

pub struct ZelleParser;

impl ProviderParser for ZelleParser {
    fn provider(&self) -> Provider {
        Provider::Zelle
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
    fn matches_is_case_insensitive() {
        assert!(ZelleParser.matches("you received money via ZELLE"));
        assert!(ZelleParser.matches("Zelle transfer complete"));
        assert!(!ZelleParser.matches("John paid you with Venmo"));
    }

    #[test]
    fn parses_full_notice() {
        let body = "You received $45.00 from John Doe via Zelle on February 3, 2024 1:14 PM.";
        let c = ZelleParser.parse(body).expect("keyword match");
        assert_eq!(c.provider, Provider::Zelle);
        assert_eq!(c.amount.as_deref(), Some("$45.00"));
        assert_eq!(c.sender, "John Doe");
        assert!(matches!(c.timestamp, TimestampField::Matched(_)));
    }

    #[test]
    fn keyword_miss_returns_none() {
        assert_eq!(ZelleParser.parse("Your statement is ready."), None);
    }

    #[test]
    fn partial_body_keeps_sentinels() {
        let c = ZelleParser.parse("You received money.").expect("keyword match");
        assert_eq!(c.amount, None);
        assert_eq!(c.sender, "Unknown Sender");
        assert_eq!(c.timestamp, TimestampField::Absent);
    }
}
