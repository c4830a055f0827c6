//! Built-in lexicon classifier used when no external model backend is wired in.

use std::collections::{HashMap, HashSet};

use crate::constants::scorer::NO_SIGNAL_CONFIDENCE;
use crate::data::{Sentiment, SentimentLabel};
use crate::errors::ModelError;
use crate::scoring::SentimentModel;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 0.6),
    ("great", 0.8),
    ("excellent", 0.9),
    ("amazing", 0.9),
    ("awesome", 0.8),
    ("love", 0.8),
    ("like", 0.3),
    ("best", 0.8),
    ("better", 0.5),
    ("happy", 0.7),
    ("win", 0.6),
    ("success", 0.7),
    ("successful", 0.7),
    ("breakthrough", 0.8),
    ("innovative", 0.6),
    ("impressive", 0.7),
    ("boom", 0.6),
    ("bullish", 0.8),
    ("surge", 0.7),
    ("rally", 0.7),
    ("soar", 0.8),
    ("gain", 0.5),
    ("profit", 0.6),
    ("growth", 0.6),
    ("rise", 0.5),
    ("improve", 0.5),
    ("outperform", 0.7),
    ("beat", 0.6),
    ("exceed", 0.6),
    ("strong", 0.5),
    ("positive", 0.5),
    ("optimistic", 0.6),
    ("confident", 0.5),
    ("record", 0.4),
    ("upgrade", 0.6),
    ("recovery", 0.5),
    ("rebound", 0.5),
    ("stable", 0.3),
    ("praise", 0.7),
    ("thrilled", 0.9),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -0.6),
    ("terrible", -0.9),
    ("awful", -0.9),
    ("horrible", -0.9),
    ("worst", -0.9),
    ("worse", -0.6),
    ("hate", -0.8),
    ("angry", -0.7),
    ("sad", -0.6),
    ("disappoint", -0.7),
    ("disappointing", -0.7),
    ("bearish", -0.8),
    ("crash", -0.9),
    ("plunge", -0.8),
    ("drop", -0.6),
    ("fall", -0.5),
    ("decline", -0.6),
    ("loss", -0.6),
    ("weak", -0.5),
    ("negative", -0.5),
    ("pessimistic", -0.6),
    ("concern", -0.5),
    ("worry", -0.5),
    ("fear", -0.6),
    ("risk", -0.4),
    ("volatile", -0.3),
    ("uncertainty", -0.5),
    ("miss", -0.6),
    ("underperform", -0.6),
    ("downgrade", -0.6),
    ("crisis", -0.8),
    ("warning", -0.5),
    ("trouble", -0.6),
    ("problem", -0.5),
    ("fail", -0.7),
    ("failure", -0.7),
    ("scam", -0.9),
    ("fraud", -0.9),
    ("scandal", -0.8),
    ("lawsuit", -0.6),
    ("layoff", -0.7),
    ("breach", -0.7),
    ("outage", -0.6),
    ("recall", -0.5),
    ("broken", -0.6),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "neither", "nobody", "nothing", "none", "cannot", "cant", "can't",
    "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "won't", "wont", "isn't", "isnt",
    "aren't", "arent", "wasn't", "wasnt", "hardly", "barely",
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("highly", 1.5),
    ("really", 1.3),
    ("so", 1.2),
    ("significantly", 1.5),
    ("dramatically", 1.8),
    ("massively", 1.8),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("marginally", 0.5),
];

/// Suffixes stripped when a token is not in the lexicon verbatim.
const SUFFIXES: &[&str] = &["ing", "ed", "es", "s", "d"];

/// Binary positive/negative classifier driven by a weighted word lexicon.
///
/// Polarity is accumulated per matched word, flipped after a negation and
/// scaled by a preceding intensifier. The label follows the sign of the total
/// and the confidence is `1 / (1 + e^(-steepness * |total|))`, so it lies in
/// `[0.5, 1)` like a two-class softmax. Text without any cue word is
/// `Neutral` at [`NO_SIGNAL_CONFIDENCE`].
pub struct LexiconModel {
    words: HashMap<String, f64>,
    negations: HashSet<String>,
    intensifiers: HashMap<String, f64>,
    steepness: f64,
}

impl Default for LexiconModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconModel {
    /// Create a model with the built-in news/social lexicon.
    pub fn new() -> Self {
        let words = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .map(|(word, weight)| ((*word).to_string(), *weight))
            .collect();
        Self {
            words,
            negations: NEGATIONS.iter().map(|word| (*word).to_string()).collect(),
            intensifiers: INTENSIFIERS
                .iter()
                .map(|(word, mult)| ((*word).to_string(), *mult))
                .collect(),
            steepness: 2.0,
        }
    }

    /// Add or override a lexicon entry.
    pub fn with_word(mut self, word: &str, weight: f64) -> Self {
        self.words.insert(word.to_lowercase(), weight);
        self
    }

    /// Override how quickly confidence saturates with accumulated polarity.
    pub fn with_steepness(mut self, steepness: f64) -> Self {
        self.steepness = steepness;
        self
    }

    /// Sum of signed word weights after negation and intensifier handling.
    ///
    /// Returns `None` when no lexicon word matched.
    pub fn polarity(&self, text: &str) -> Option<f64> {
        let mut total = 0.0;
        let mut matched = 0usize;
        let mut negate_next = false;
        let mut intensifier = 1.0;

        for raw in text.split_whitespace() {
            let token = normalize_token(raw);
            if token.is_empty() {
                continue;
            }
            if self.negations.contains(&token) {
                negate_next = true;
                continue;
            }
            if let Some(mult) = self.intensifiers.get(&token) {
                intensifier = *mult;
                continue;
            }
            match self.lookup(&token) {
                Some(weight) => {
                    let signed = if negate_next { -weight } else { weight };
                    total += signed * intensifier;
                    matched += 1;
                    negate_next = false;
                    intensifier = 1.0;
                }
                None => {
                    intensifier = 1.0;
                }
            }
        }

        (matched > 0).then_some(total)
    }

    fn lookup(&self, token: &str) -> Option<f64> {
        if let Some(weight) = self.words.get(token) {
            return Some(*weight);
        }
        SUFFIXES.iter().find_map(|suffix| {
            token
                .strip_suffix(suffix)
                .filter(|stem| stem.len() >= 3)
                .and_then(|stem| self.words.get(stem))
                .copied()
        })
    }
}

fn normalize_token(raw: &str) -> String {
    raw.trim_matches(|ch: char| !ch.is_alphanumeric() && ch != '\'')
        .trim_matches('\'')
        .to_lowercase()
}

impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn classify(&self, text: &str) -> Result<Sentiment, ModelError> {
        let Some(total) = self.polarity(text) else {
            return Ok(Sentiment {
                label: SentimentLabel::Neutral,
                score: NO_SIGNAL_CONFIDENCE,
            });
        };
        if total == 0.0 {
            return Ok(Sentiment {
                label: SentimentLabel::Neutral,
                score: NO_SIGNAL_CONFIDENCE,
            });
        }
        let label = if total > 0.0 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Negative
        };
        let confidence = 1.0 / (1.0 + (-self.steepness * total.abs()).exp());
        Ok(Sentiment {
            label,
            score: confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_clear_polarity() {
        let model = LexiconModel::new();
        let positive = model.classify("Great quarter, shares surge on record profit").unwrap();
        assert_eq!(positive.label, SentimentLabel::Positive);
        assert!(positive.score > 0.5 && positive.score < 1.0);

        let negative = model.classify("Crypto crash deepens amid fraud lawsuit").unwrap();
        assert_eq!(negative.label, SentimentLabel::Negative);
        assert!(negative.score > 0.5 && negative.score < 1.0);
    }

    #[test]
    fn negation_flips_and_intensifier_scales() {
        let model = LexiconModel::new();
        assert!(model.polarity("not good").unwrap() < 0.0);
        let plain = model.polarity("good").unwrap();
        let boosted = model.polarity("extremely good").unwrap();
        assert!(boosted > plain);
        assert_eq!(
            model.classify("This isn't bad").unwrap().label,
            SentimentLabel::Positive
        );
    }

    #[test]
    fn suffix_stripping_matches_inflections() {
        let model = LexiconModel::new();
        assert!(model.polarity("Shares surged").unwrap() > 0.0);
        assert!(model.polarity("layoffs announced").unwrap() < 0.0);
        assert!(model.polarity("crashing").unwrap() < 0.0);
    }

    #[test]
    fn no_cue_words_is_neutral_half_confidence() {
        let model = LexiconModel::new();
        let result = model.classify("The committee met on Tuesday").unwrap();
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.score, NO_SIGNAL_CONFIDENCE);
        assert_eq!(model.polarity("!!! ???"), None);
    }

    #[test]
    fn balanced_polarity_is_neutral() {
        let model = LexiconModel::new().with_word("meh", 0.0);
        let result = model.classify("meh").unwrap();
        assert_eq!(result.label, SentimentLabel::Neutral);
    }

    #[test]
    fn confidence_grows_with_polarity() {
        let model = LexiconModel::new();
        let mild = model.classify("good").unwrap().score;
        let strong = model.classify("great amazing excellent love").unwrap().score;
        assert!(strong > mild);
        let steep = LexiconModel::new().with_steepness(10.0);
        assert!(steep.classify("good").unwrap().score > mild);
    }
}
