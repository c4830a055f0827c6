//! Text normalization helpers shared by the normalizer and scorer.

use std::sync::LazyLock;

use regex::Regex;

/// English stopwords removed by [`clean_text`].
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "ourselves", "out", "over", "own", "s", "same", "she", "should", "so", "some",
    "such", "t", "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "you", "your", "yours", "yourself", "yourselves",
];

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Turn a dataset identifier into a display label: `google_news` → `Google News`.
///
/// Each alphabetic run is capitalised with the remainder lowercased; underscores
/// become spaces.
pub fn display_label(source_id: &str) -> String {
    let mut label = String::with_capacity(source_id.len());
    let mut at_word_start = true;
    for ch in source_id.chars() {
        if ch == '_' {
            label.push(' ');
            at_word_start = true;
        } else if ch.is_alphabetic() {
            if at_word_start {
                label.extend(ch.to_uppercase());
            } else {
                label.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            label.push(ch);
            at_word_start = true;
        }
    }
    label
}

/// URLs up to the next whitespace, wherever they start.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?\S+|www\S+").expect("valid url pattern"));

/// `@mention` and `#hashtag` markers; the word itself is kept.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@#](\w+)").expect("valid tag pattern"));

static NON_ALPHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z\s]").expect("valid letter pattern"));

/// Plural nouns whose singular is not reachable by suffix rules.
const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("analyses", "analysis"),
    ("children", "child"),
    ("crises", "crisis"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("men", "man"),
    ("mice", "mouse"),
    ("teeth", "tooth"),
    ("women", "woman"),
];

/// Words ending in `s` that are already their own lemma.
const INVARIANT_NOUNS: &[&str] = &["news", "series", "species", "always", "perhaps", "physics"];

/// Clean social/news text before classification.
///
/// Drops URLs, unwraps `@mentions` and `#hashtags`, lowercases, keeps only ASCII
/// letters and whitespace, removes English stopwords and reduces plural nouns
/// to their singular with [`lemmatize`].
pub fn clean_text(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, "");
    let untagged = TAG_RE.replace_all(&without_urls, "$1");
    let lowered = untagged.to_lowercase();
    let letters = NON_ALPHA_RE.replace_all(&lowered, "");
    letters
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word))
        .map(lemmatize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a lowercase noun to its dictionary form.
///
/// Covers regular English plurals (`markets`, `companies`, `boxes`, `losses`)
/// and a short list of irregular ones. Words that are not plural nouns pass
/// through unchanged.
pub fn lemmatize(word: &str) -> String {
    if let Some((_, lemma)) = IRREGULAR_NOUNS.iter().find(|(plural, _)| *plural == word) {
        return (*lemma).to_string();
    }
    if INVARIANT_NOUNS.contains(&word) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies").filter(|stem| stem.len() >= 2) {
        return format!("{stem}y");
    }
    if let Some(stem) = word.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    for suffix in ["xes", "zes", "ches", "shes"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    if word.len() >= 4
        && !["ss", "us", "is"].iter().any(|tail| word.ends_with(tail))
        && let Some(stem) = word.strip_suffix('s')
    {
        return stem.to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_inline_whitespace_collapses_runs() {
        let input = "Alpha\n\n  Beta\tGamma";
        assert_eq!(normalize_inline_whitespace(input), "Alpha Beta Gamma");
    }

    #[test]
    fn display_label_title_cases_identifiers() {
        assert_eq!(display_label("google_news"), "Google News");
        assert_eq!(display_label("social_searcher"), "Social Searcher");
        assert_eq!(display_label("SOCIAL_searcher"), "Social Searcher");
        assert_eq!(display_label("feed2go"), "Feed2Go");
        assert_eq!(display_label(""), "");
    }

    #[test]
    fn clean_text_strips_urls_symbols_and_stopwords() {
        let cleaned = clean_text("Check https://t.co/xyz @Acme is #Winning the market!!! 2024");
        assert_eq!(cleaned, "check acme winning market");
    }

    #[test]
    fn clean_text_handles_empty_and_symbol_only_input() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("!!! 123 ..."), "");
        assert_eq!(clean_text("www.example.com"), "");
    }

    #[test]
    fn clean_text_removes_urls_glued_to_punctuation() {
        assert_eq!(
            clean_text("Read (https://t.co/abc) now, see:https://x.io/y"),
            "read see"
        );
        assert_eq!(clean_text("via@Desk: rally!www.example.com/x"), "viadesk rally");
    }

    #[test]
    fn clean_text_lemmatizes_plural_nouns() {
        assert_eq!(
            clean_text("Stocks rally as companies post gains"),
            "stock rally company post gain"
        );
    }

    #[test]
    fn lemmatize_handles_regular_and_irregular_plurals() {
        assert_eq!(lemmatize("markets"), "market");
        assert_eq!(lemmatize("losses"), "loss");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("churches"), "church");
        assert_eq!(lemmatize("crises"), "crisis");
        assert_eq!(lemmatize("women"), "woman");
        assert_eq!(lemmatize("news"), "news");
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("gas"), "gas");
        assert_eq!(lemmatize("winning"), "winning");
    }
}
