//! Regex detector for personal information categories.

use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use crate::domain::errors::DetectorError;
use crate::domain::models::{Document, Span};
use crate::domain::ports::{require_text, CategorySpans, Detector};

pub const CREDIT_CARD: &str = "credit_card";
pub const CRYPTO_ADDRESS: &str = "crypto_address";
pub const EMAIL_ADDRESS: &str = "email_address";
pub const BANK_NUMBER: &str = "bank_number";
pub const IP_ADDRESS: &str = "ip_address";
pub const PHONE_NUMBER: &str = "phone_number";

/// Categories emitted by [`PatternDetector`], in output order
pub const PII_CATEGORIES: [&str; 6] = [
    CREDIT_CARD,
    CRYPTO_ADDRESS,
    EMAIL_ADDRESS,
    BANK_NUMBER,
    IP_ADDRESS,
    PHONE_NUMBER,
];

struct PatternRule {
    category: &'static str,
    regex: Regex,
    /// Rejects regex candidates that are not real matches (checksums, ranges)
    validate: fn(&str) -> bool,
}

impl PatternRule {
    fn new(category: &'static str, pattern: &str, validate: fn(&str) -> bool) -> Self {
        Self {
            category,
            regex: Regex::new(pattern).expect("built-in PII pattern is valid"),
            validate,
        }
    }
}

static RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    vec![
        PatternRule::new(CREDIT_CARD, r"\b\d(?:[ -]?\d){12,18}\b", luhn_valid),
        PatternRule::new(
            CRYPTO_ADDRESS,
            r"\b(?:bc1[a-z0-9]{25,59}|[13][a-km-zA-HJ-NP-Z1-9]{25,34}|0x[a-fA-F0-9]{40})\b",
            |_| true,
        ),
        PatternRule::new(
            EMAIL_ADDRESS,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}\b",
            |_| true,
        ),
        PatternRule::new(
            BANK_NUMBER,
            r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]{4}){2,7}(?: ?[A-Z0-9]{1,3})?\b",
            iban_valid,
        ),
        PatternRule::new(IP_ADDRESS, r"\b\d{1,3}(?:\.\d{1,3}){3}\b", |candidate| {
            candidate.parse::<Ipv4Addr>().is_ok()
        }),
        PatternRule::new(
            IP_ADDRESS,
            r"(?:[0-9a-fA-F]{1,4}:){1,7}(?:(?::[0-9a-fA-F]{1,4}){1,6}|[0-9a-fA-F]{1,4}|:)",
            |candidate| candidate.parse::<Ipv6Addr>().is_ok(),
        ),
        PatternRule::new(
            PHONE_NUMBER,
            r"(?:\+?1[ .-]?)?(?:\(\d{3}\) ?|\b\d{3}[ .-]?)\d{3}[ .-]\d{4}\b",
            |_| true,
        ),
    ]
});

/// Luhn checksum over the digits of a card number candidate
fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// ISO 13616 mod-97 check
fn iban_valid(candidate: &str) -> bool {
    let compact: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
    if !(15..=34).contains(&compact.len()) {
        return false;
    }
    let (head, tail) = compact.split_at(4);
    let mut remainder: u32 = 0;
    for c in tail.chars().chain(head.chars()) {
        let Some(value) = c.to_digit(36) else {
            return false;
        };
        let width = if value < 10 { 10 } else { 100 };
        remainder = (remainder * width + value) % 97;
    }
    remainder == 1
}

/// Detects personal information with a fixed table of regex rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetector;

impl PatternDetector {
    pub const fn new() -> Self {
        Self
    }

    fn scan(text: &str) -> CategorySpans {
        let mut found = CategorySpans::new();
        for rule in RULES.iter() {
            for m in rule.regex.find_iter(text) {
                if (rule.validate)(m.as_str()) {
                    found
                        .entry(rule.category.to_string())
                        .or_default()
                        .push(Span::from(m));
                }
            }
        }
        found
    }
}

impl Detector for PatternDetector {
    fn name(&self) -> &str {
        "patterns"
    }

    fn categories(&self) -> Vec<String> {
        PII_CATEGORIES.iter().map(ToString::to_string).collect()
    }

    fn detect(&self, document: &Document) -> Result<CategorySpans, DetectorError> {
        let text = require_text(document)?;
        Ok(Self::scan(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(text: &str, category: &str) -> Vec<String> {
        let found = PatternDetector::new().detect(&Document::from(text)).unwrap();
        found
            .get(category)
            .map(|spans| {
                spans
                    .iter()
                    .map(|span| span.slice(text).unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(spans("Call me at 555-123-4567", PHONE_NUMBER), vec!["555-123-4567"]);
        assert_eq!(spans("office: (555) 123-4567.", PHONE_NUMBER), vec!["(555) 123-4567"]);
        assert_eq!(spans("+1 555.123.4567", PHONE_NUMBER), vec!["+1 555.123.4567"]);
    }

    #[test]
    fn test_email() {
        assert_eq!(
            spans("write to jane.doe+news@mail.example.org today", EMAIL_ADDRESS),
            vec!["jane.doe+news@mail.example.org"]
        );
    }

    #[test]
    fn test_credit_card_requires_luhn() {
        assert_eq!(
            spans("card 4111 1111 1111 1111 expires", CREDIT_CARD),
            vec!["4111 1111 1111 1111"]
        );
        assert!(spans("order 4111 1111 1111 1112", CREDIT_CARD).is_empty());
    }

    #[test]
    fn test_ip_addresses() {
        assert_eq!(spans("host 192.168.0.12 up", IP_ADDRESS), vec!["192.168.0.12"]);
        assert!(spans("version 999.1.1.1", IP_ADDRESS).is_empty());
        assert_eq!(spans("v6 2001:db8::1 ok", IP_ADDRESS), vec!["2001:db8::1"]);
    }

    #[test]
    fn test_iban() {
        assert_eq!(
            spans("pay to GB82 WEST 1234 5698 7654 32 please", BANK_NUMBER),
            vec!["GB82 WEST 1234 5698 7654 32"]
        );
        assert!(spans("ref GB00 WEST 1234 5698 7654 32", BANK_NUMBER).is_empty());
    }

    #[test]
    fn test_crypto_address() {
        assert_eq!(
            spans("send to 0x52908400098527886E0F7030069857D2E4169EE7", CRYPTO_ADDRESS),
            vec!["0x52908400098527886E0F7030069857D2E4169EE7"]
        );
    }

    #[test]
    fn test_non_text_document() {
        let result = PatternDetector::new().detect(&Document::Other(serde_json::json!(42)));
        assert_eq!(result, Err(DetectorError::NonTextInput));
    }

    #[test]
    fn test_plain_text_has_no_spans() {
        let found = PatternDetector::new()
            .detect(&Document::from("nothing sensitive here"))
            .unwrap();
        assert!(found.is_empty());
    }
}
