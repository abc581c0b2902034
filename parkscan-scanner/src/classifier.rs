use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Phrases that mark a registrar or marketplace placeholder page.
///
/// Kept verbatim (including the "domian" typo) so results stay comparable with
/// lists produced by earlier scans.
pub const PARKED_PHRASES: &[&str] = &[
    "buy this domain",
    "parked free",
    "godaddy",
    "is for sale",
    "domain parking",
    "renew now",
    "this domain",
    "namecheap",
    "buy now for",
    "hugedomains",
    "is owned and listed by",
    "sav.com",
    "searchvity.com",
    "domain for sale",
    "register4less",
    "aplus.net",
    "related searches",
    "related links",
    "search ads",
    "domain expert",
    "united domains",
    "domian name has been registered",
    "this domain may be for sale",
    "domain name is available for sale",
    "premium domain",
    "this domain name",
    "this domain has expired",
    "domainpage.io",
    "sedoparking.com",
    "parking-lander",
];

static PARKED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = PARKED_PHRASES
        .iter()
        .map(|phrase| regex::escape(phrase))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .expect("escaped phrase list is a valid pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Active,
    Parked,
}

/// Classify a page body. Matching is a case-insensitive substring search over
/// the raw text, so markup around a phrase does not matter.
pub fn classify(body: &str) -> Classification {
    if PARKED_PATTERN.is_match(body) {
        Classification::Parked
    } else {
        Classification::Active
    }
}

/// First parked phrase found in `body`, as it appears in the page.
pub fn matched_phrase(body: &str) -> Option<&str> {
    PARKED_PATTERN.find(body).map(|m| m.as_str())
}
