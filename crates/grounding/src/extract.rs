/// Mention extraction from free-form assistant text.
///
/// Two independent grammars run over the same text:
/// - inline mentions: proper-cased phrases ending in the catalog's
///   jurisdiction suffix ("Nando's Bahrain")
/// - numbered recommendation blocks pairing a dish with a restaurant, in
///   either field order
///
/// Nothing here consults the catalog; every mention is unverified.
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::ExtractedMention;

/// Lead-in words that the inline grammar picks up at sentence starts.
const LEAD_IN_STOPLIST: &[&str] = &[
    "in", "at", "the", "available", "from", "try", "visit", "order", "located", "enjoy",
    "check", "also", "head", "near",
];

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Token every catalog restaurant name ends with.
    pub suffix: String,
    pub max_inline: usize,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            suffix: "Bahrain".to_string(),
            max_inline: 10,
            min_len: 4,
            max_len: 60,
        }
    }
}

static BLOCK_DELIMITER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#{1,6}[ \t]+)?\d+\.[ \t]+").expect("valid regex")
});

static BOLD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*\*(.+?)\*\*").expect("valid regex"));

static DISH_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:[-*•][ \t]*)?(?:\*\*)?dish(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.+)$")
        .expect("valid regex")
});

static RESTAURANT_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:[-*•][ \t]*)?(?:\*\*)?restaurant(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(.+)$",
    )
    .expect("valid regex")
});

static PRICE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:[-–—|:,]\s*)?\(?\s*\b(?:bd|bhd)\s*\d+(?:\.\d+)?.*$").expect("valid regex")
});

pub struct EntityExtractor {
    config: ExtractorConfig,
    inline_re: Regex,
    suffix_lower: String,
}

impl EntityExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let word = r"(?:[\p{Lu}\p{N}][\p{L}\p{N}'’&\-]*|&)";
        let pattern = format!(
            r"(?:{word}[ \t]+){{1,5}}{suffix}\b",
            suffix = regex::escape(&config.suffix)
        );
        let inline_re = Regex::new(&pattern).expect("suffix is escaped, pattern is valid");
        let suffix_lower = config.suffix.to_lowercase();
        Self {
            config,
            inline_re,
            suffix_lower,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn has_suffix(&self, name: &str) -> bool {
        contains_word(&name.to_lowercase(), &self.suffix_lower)
    }

    /// Inline mentions first (in text order), then pair blocks.
    pub fn extract(&self, text: &str) -> Vec<ExtractedMention> {
        let mut mentions: Vec<ExtractedMention> = self
            .inline_mentions(text)
            .into_iter()
            .map(|name| ExtractedMention::Inline { name })
            .collect();
        mentions.extend(self.pair_mentions(text));
        mentions
    }

    pub fn inline_mentions(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for m in self.inline_re.find_iter(text) {
            let Some(name) = strip_lead_in(m.as_str()) else {
                continue;
            };
            if name.eq_ignore_ascii_case(&self.config.suffix) {
                continue;
            }
            let len = name.chars().count();
            if len < self.config.min_len || len > self.config.max_len {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                out.push(name);
                if out.len() >= self.config.max_inline {
                    break;
                }
            }
        }
        out
    }

    pub fn pair_mentions(&self, text: &str) -> Vec<ExtractedMention> {
        split_numbered_blocks(text)
            .into_iter()
            .filter_map(|block| self.parse_pair_block(block))
            .collect()
    }

    fn parse_pair_block(&self, block: &str) -> Option<ExtractedMention> {
        let heading = block_heading(block)?;
        let dish_field = field_value(&DISH_FIELD_RE, block);
        let restaurant_field = field_value(&RESTAURANT_FIELD_RE, block);

        // Heading is the restaurant, "Dish:" follows.
        if let Some(dish) = dish_field.as_deref() {
            if let Some(pair) = self.validated_pair(dish, &heading) {
                return Some(pair);
            }
        }
        // Heading is the dish, "Restaurant:" follows.
        if let Some(restaurant) = restaurant_field.as_deref() {
            if let Some(pair) = self.validated_pair(&heading, restaurant) {
                return Some(pair);
            }
        }
        None
    }

    fn validated_pair(&self, dish: &str, restaurant: &str) -> Option<ExtractedMention> {
        if dish.is_empty() || restaurant.is_empty() {
            return None;
        }
        if self.has_suffix(dish) || !self.has_suffix(restaurant) {
            return None;
        }
        Some(ExtractedMention::Pair {
            dish_name: dish.to_string(),
            restaurant_name: restaurant.to_string(),
        })
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

/// Splits on "1. " / "### 1. " list delimiters. Text before the first
/// delimiter is not a block.
pub fn split_numbered_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<(usize, usize)> = BLOCK_DELIMITER_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let end = starts.get(i + 1).map(|&(s, _)| s).unwrap_or(text.len());
            &text[body_start..end]
        })
        .collect()
}

fn block_heading(block: &str) -> Option<String> {
    let raw = match BOLD_HEADING_RE.captures(block) {
        Some(caps) => caps.get(1)?.as_str().to_string(),
        None => block.lines().next()?.to_string(),
    };
    // A first line that is itself a labeled field is not a heading.
    if DISH_FIELD_RE.is_match(&raw) || RESTAURANT_FIELD_RE.is_match(&raw) {
        return None;
    }
    let cleaned = clean_field(&raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn field_value(re: &Regex, block: &str) -> Option<String> {
    let caps = re.captures(block)?;
    let cleaned = clean_field(caps.get(1)?.as_str());
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Drops markdown emphasis, trailing price annotations and punctuation.
pub fn clean_field(raw: &str) -> String {
    let no_markup: String = raw
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect();
    let no_price = PRICE_TAIL_RE.replace(&no_markup, "");
    no_price
        .trim()
        .trim_end_matches(['.', ',', ';', ':', '-', '–', '—'])
        .trim()
        .to_string()
}

fn strip_lead_in(phrase: &str) -> Option<String> {
    let mut words: Vec<&str> = phrase.split_whitespace().collect();
    while let Some(first) = words.first() {
        let lower = first.to_lowercase();
        if *first == "&" || LEAD_IN_STOPLIST.contains(&lower.as_str()) {
            words.remove(0);
        } else {
            break;
        }
    }
    (!words.is_empty()).then(|| words.join(" "))
}

/// Whole-word containment on already-lowercased inputs.
pub(crate) fn contains_word(haystack: &str, word: &str) -> bool {
    find_word(haystack, word).is_some()
}

/// Byte offset of the first whole-word occurrence of `needle` in `haystack`.
/// Both sides are expected to be lowercased by the caller.
pub(crate) fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let start = from + rel;
        let end = start + needle.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return Some(start);
        }
        from = start
            + haystack[start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::default()
    }

    fn pair(dish: &str, restaurant: &str) -> ExtractedMention {
        ExtractedMention::Pair {
            dish_name: dish.to_string(),
            restaurant_name: restaurant.to_string(),
        }
    }

    #[test]
    fn test_inline_mentions_deduplicated() {
        let text = "Nando's Bahrain is great. I also love Nando's Bahrain for wings, \
and Shake Shack Bahrain nearby.";
        let names = extractor().inline_mentions(text);
        assert_eq!(names, vec!["Nando's Bahrain", "Shake Shack Bahrain"]);
    }

    #[test]
    fn test_inline_lead_in_stripped_or_rejected() {
        let text = "In Bahrain, you can try At Nando's Bahrain. Available Bahrain wide.";
        let names = extractor().inline_mentions(text);
        assert_eq!(names, vec!["Nando's Bahrain"]);
    }

    #[test]
    fn test_inline_inside_bold_markup() {
        let names = extractor().inline_mentions("Try **Mezzaterra Bahrain** tonight");
        assert_eq!(names, vec!["Mezzaterra Bahrain"]);
    }

    #[test]
    fn test_inline_capped() {
        let text: String = (0..15)
            .map(|i| format!("Place{i} Bahrain. "))
            .collect();
        assert_eq!(extractor().inline_mentions(&text).len(), 10);
    }

    #[test]
    fn test_inline_length_filter() {
        let config = ExtractorConfig {
            max_len: 20,
            ..ExtractorConfig::default()
        };
        let ex = EntityExtractor::new(config);
        let names = ex.inline_mentions("Very Long Restaurant Name Here Bahrain and Ok Bahrain");
        assert_eq!(names, vec!["Ok Bahrain"]);
    }

    #[test]
    fn test_split_numbered_blocks() {
        let text = "Here you go:\n1. **A**\n- Dish: x\n\n### 2. **B**\n- Dish: y\n";
        let blocks = split_numbered_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("**A**"));
        assert!(blocks[1].starts_with("**B**"));
    }

    #[test]
    fn test_pair_layout_restaurant_heading() {
        let text = "### 1. **Nando's Bahrain**\n - **Dish:** Peri-Peri Chicken";
        assert_eq!(
            extractor().pair_mentions(text),
            vec![pair("Peri-Peri Chicken", "Nando's Bahrain")]
        );
    }

    #[test]
    fn test_pair_layout_dish_heading() {
        let text = "1. **Peri-Peri Chicken** - BD 3.500\n   - **Restaurant:** Nando's Bahrain\n";
        assert_eq!(
            extractor().pair_mentions(text),
            vec![pair("Peri-Peri Chicken", "Nando's Bahrain")]
        );
    }

    #[test]
    fn test_pair_layouts_agree() {
        let layout_one = "1. **Shake Shack Bahrain**\n- Dish: ShackBurger (BD 2.900)\n\
2. **Nando's Bahrain**\n- **Dish**: Halloumi Sticks\n";
        let layout_two = "### 1. **ShackBurger**\n- Restaurant: Shake Shack Bahrain\n\
### 2. **Halloumi Sticks**\n- **Restaurant:** Nando's Bahrain.\n";
        let ex = extractor();
        assert_eq!(ex.pair_mentions(layout_one), ex.pair_mentions(layout_two));
        assert_eq!(ex.pair_mentions(layout_one).len(), 2);
    }

    #[test]
    fn test_pair_incomplete_blocks_dropped() {
        let text = "1. **Nando's Bahrain**\nGreat chicken.\n\
2. **Peri-Peri Chicken**\n- Restaurant: Nando's\n\
3. **Nando's Bahrain**\n- Dish: Wrap at Nando's Bahrain\n";
        assert!(extractor().pair_mentions(text).is_empty());
    }

    #[test]
    fn test_malformed_text_yields_nothing() {
        let ex = extractor();
        assert!(ex.extract("").is_empty());
        assert!(ex.extract("**** 1. ### \n::: Dish:").is_empty());
        assert!(ex.extract("just chatting, nothing to recommend").is_empty());
    }

    #[test]
    fn test_clean_field() {
        assert_eq!(clean_field("**Machboos** - BD 2.500"), "Machboos");
        assert_eq!(clean_field("Karak Chai (BHD 0.300)"), "Karak Chai");
        assert_eq!(clean_field("  `Hummus`. "), "Hummus");
    }

    #[test]
    fn test_find_word_boundaries() {
        assert_eq!(find_word("instead of tea", "tea"), Some(11));
        assert_eq!(find_word("steak", "tea"), None);
        assert_eq!(find_word("nando's bahrain", "bahrain"), Some(8));
    }
}
