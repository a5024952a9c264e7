//! Code-shape grammar shared by structured reads and the text fallback.

use std::sync::LazyLock;

use regex::Regex;

const MIN_CODE_LEN: usize = 4;
const MAX_CODE_LEN: usize = 15;

/// Tokens that look like codes but are markup picked up by naive scraping.
const BLACKLIST: [&str; 12] = [
    "DOCTYPE", "HTTP", "HTTPS", "HTML", "HEAD", "BODY", "SCRIPT", "STYLE", "META", "LINK", "DIV",
    "SPAN",
];

static CODE_SHAPES: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        r"^[A-Z0-9]+$",
        r"^SAVE\d+$",
        r"^NEW\d+$",
        r"^\d+OFF$",
        r"^[A-Z]+\d+[A-Z]*$",
        r"^[A-Z]{2,}\d{2,}$",
    ]
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
});

/// Returns `true` if `text` has the shape of a discount code.
///
/// Matching is case-sensitive: free page text like "Shipping" is not a code,
/// while "SHIP20" is. Callers reading from a known code holder should pass
/// the value through [`normalize_code`] first.
#[must_use]
pub fn is_code_shaped(text: &str) -> bool {
    let len = text.chars().count();
    if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
        return false;
    }
    if BLACKLIST.contains(&text) {
        return false;
    }
    CODE_SHAPES.iter().any(|re| re.is_match(text))
}

/// Upper-cases and trims a code read from a code holder, returning it only
/// if it satisfies the grammar.
#[must_use]
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    is_code_shaped(&code).then_some(code)
}
