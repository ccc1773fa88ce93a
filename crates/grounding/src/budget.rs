/// Per-turn budget ceiling extraction from the user's own message.
///
/// Only the number sitting next to a budget keyword counts; stray numbers
/// ("2 people", "table for 4") are ignored unless they follow a keyword.
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::model::Budget;

const KEYWORDS: &str = r"i\s+only\s+have|i\s+have|i've\s+got|i\s+got|budget(?:\s+(?:of|is))?|under|below|less\s+than|no\s+more\s+than|not\s+more\s+than|maximum|max|up\s+to|within";
const NOISE: &str = r"only|just|about|around|roughly|like|a|of|is|my";
const CURRENCY: &str = r"bd|bhd|dinars?";
const AMOUNT: &str = r"\d+(?:\.\d+)?";

static LEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{KEYWORDS})\b[\s:=]*(?:(?:{NOISE})\s+)*(?:(?:{CURRENCY})\s*)?({AMOUNT})"
    ))
    .expect("valid regex")
});

static TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({AMOUNT})\s*(?:(?:{CURRENCY})\b\s*)?(?:budget|maximum|max)\b"
    ))
    .expect("valid regex")
});

static PRICE_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:cheap|cheaper|cheapest|affordable|inexpensive|budget|low[\s-]cost|value|economical)\b")
        .expect("valid regex")
});

// A word right after the amount that makes it a count ("2 kids"), unless it
// is a currency or a budget word.
static FOLLOWING_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(\p{L}+)").expect("valid regex"));

static UNIT_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^(?:{CURRENCY}|budget|maximum|max)$")).expect("valid regex")
});

/// Extracts an explicit currency ceiling, e.g. "I have 2 BD" or "under BD 10".
///
/// The earliest keyword-adjacent amount wins, except that an amount which
/// counts something ("I have 2 kids, budget 5") yields to a later one.
/// Returns `None` when the message carries no budget; never a zero ceiling.
pub fn extract_budget(message: &str) -> Option<Budget> {
    let mut candidates: Vec<regex::Match<'_>> = LEADING_RE
        .captures_iter(message)
        .filter_map(|caps| caps.get(1))
        .chain(TRAILING_RE.captures_iter(message).filter_map(|caps| caps.get(1)))
        .collect();
    candidates.sort_by_key(|m| m.start());

    let amount = candidates
        .iter()
        .find(|m| !counts_something(message, m.end()))
        .or_else(|| candidates.first())?;

    Decimal::from_str(amount.as_str()).ok().map(Budget)
}

fn counts_something(message: &str, amount_end: usize) -> bool {
    FOLLOWING_WORD_RE
        .captures(&message[amount_end..])
        .and_then(|caps| caps.get(1))
        .is_some_and(|word| !UNIT_WORD_RE.is_match(word.as_str()))
}

/// True when the user asks for cheap options, with or without an explicit ceiling.
pub fn is_price_sensitive(message: &str) -> bool {
    PRICE_WORDS_RE.is_match(message) || extract_budget(message).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceiling(message: &str) -> Option<String> {
        extract_budget(message).map(|b| b.ceiling().to_string())
    }

    #[test]
    fn test_keyword_then_number() {
        assert_eq!(ceiling("I have 2 BD, show me cheap snacks").as_deref(), Some("2"));
        assert_eq!(ceiling("budget of 5").as_deref(), Some("5"));
        assert_eq!(ceiling("something under 10 please").as_deref(), Some("10"));
        assert_eq!(ceiling("MAX 3 bd").as_deref(), Some("3"));
    }

    #[test]
    fn test_currency_before_number() {
        assert_eq!(ceiling("anything under BD 10?").as_deref(), Some("10"));
        assert_eq!(ceiling("i have bhd4 left").as_deref(), Some("4"));
    }

    #[test]
    fn test_noise_words_skipped() {
        assert_eq!(ceiling("I have only 2 dinars").as_deref(), Some("2"));
        assert_eq!(ceiling("my budget is about 6").as_deref(), Some("6"));
        assert_eq!(ceiling("Budget: 7 BD").as_deref(), Some("7"));
    }

    #[test]
    fn test_trailing_form() {
        assert_eq!(ceiling("5 BD budget, what can I get").as_deref(), Some("5"));
        assert_eq!(ceiling("lunch for 3 max").as_deref(), Some("3"));
    }

    #[test]
    fn test_fraction_preserved() {
        assert_eq!(ceiling("I have 2.5 BD").as_deref(), Some("2.5"));
        assert_eq!(ceiling("under 2.750").as_deref(), Some("2.750"));
    }

    #[test]
    fn test_number_next_to_keyword_wins() {
        assert_eq!(ceiling("table for 4, under 12 BD").as_deref(), Some("12"));
        assert_eq!(ceiling("I have a 5 BD budget for 2 people").as_deref(), Some("5"));
        assert_eq!(ceiling("I have 2 kids, budget 5").as_deref(), Some("5"));
        assert_eq!(ceiling("I have 3 friends coming, max 9 BD").as_deref(), Some("9"));
    }

    #[test]
    fn test_lone_amount_kept_even_before_a_word() {
        assert_eq!(ceiling("under 10 please").as_deref(), Some("10"));
        assert_eq!(ceiling("I have 2 kids").as_deref(), Some("2"));
    }

    #[test]
    fn test_no_constraint() {
        assert_eq!(extract_budget("show me burgers"), None);
        assert_eq!(extract_budget("we are 4 people"), None);
        assert_eq!(extract_budget("I have a question"), None);
    }

    #[test]
    fn test_price_sensitivity() {
        assert!(is_price_sensitive("something cheap"));
        assert!(is_price_sensitive("under 3 BD"));
        assert!(!is_price_sensitive("best sushi in town"));
    }
}
