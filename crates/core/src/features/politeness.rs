//! Politeness strategy markers.
//!
//! Each strategy is a 0/1 indicator detected from lexicons and short phrase
//! patterns over the lowercased message with punctuation kept. The strategy set
//! follows the politeness framework of Danescu-Niculescu-Mizil et al. (2013).

use std::sync::LazyLock;

use regex::Regex;

use crate::features::{FeatureFailure, FeatureRecord};
use crate::{ChatFeature, FieldSpec, TextVariant};

/// Output field names, in column order.
pub const POLITENESS_STRATEGIES: [&str; 21] = [
    "please",
    "please_start",
    "hashedge",
    "indirect_(btw)",
    "hedges",
    "factuality",
    "deference",
    "gratitude",
    "apologizing",
    "1st_person_pl.",
    "1st_person",
    "1st_person_start",
    "2nd_person",
    "2nd_person_start",
    "indirect_(greeting)",
    "direct_question",
    "direct_start",
    "haspositive",
    "hasnegative",
    "subjunctive",
    "indicative",
];

static FIELDS: LazyLock<Vec<FieldSpec>> = LazyLock::new(|| {
    POLITENESS_STRATEGIES
        .iter()
        .map(|name| FieldSpec::new(*name, 0i64))
        .collect()
});

// Words keep inner apostrophes so contractions like "i'm" stay whole.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+(?:'\w+)*").unwrap());

const HEDGE_WORDS: &[&str] = &[
    "think", "thought", "believe", "suggest", "guess", "presume", "suppose", "assume", "maybe",
    "perhaps", "possibly", "probably", "apparently", "somewhat", "seem", "seems", "seemed",
    "likely", "unlikely", "might", "almost", "fairly", "roughly",
];
const HEDGE_PHRASES: &[&str] = &["sort of", "kind of", "more or less"];
const HEDGE_VERBS: &[&str] = &[
    "think", "believe", "suggest", "guess", "assume", "suppose", "presume", "feel", "wonder",
];
const FACTUALITY_WORDS: &[&str] = &["really", "actually", "honestly", "surely"];
const FACTUALITY_PHRASES: &[&str] = &["in fact", "the point", "the reality", "the truth"];
const DEFERENCE_STARTS: &[&str] = &[
    "great", "good", "nice", "interesting", "cool", "excellent", "awesome",
];
const GRATITUDE_WORDS: &[&str] = &["appreciate", "appreciated", "grateful"];
const APOLOGY_WORDS: &[&str] = &[
    "sorry", "oops", "woops", "whoops", "apologize", "apologise", "apologies", "forgive",
    "excuse",
];
const FIRST_PERSON_PLURAL: &[&str] = &[
    "we", "our", "us", "ours", "ourselves", "we're", "we've", "we'll", "we'd", "let's",
];
const FIRST_PERSON: &[&str] = &["i", "my", "mine", "me", "myself", "i'm", "i've", "i'll", "i'd"];
const SECOND_PERSON: &[&str] = &[
    "you", "your", "yours", "yourself", "yourselves", "you're", "you've", "you'll", "you'd",
];
const GREETINGS: &[&str] = &["hi", "hello", "hey", "greetings", "howdy"];
const QUESTION_STARTS: &[&str] = &["what", "why", "who", "how"];
const DIRECT_STARTS: &[&str] = &["so", "then", "and", "but", "or"];
const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "nice", "excellent", "awesome", "amazing", "wonderful", "fantastic",
    "love", "like", "happy", "glad", "perfect", "best", "better", "brilliant", "helpful",
    "agree", "right", "correct", "fine", "cool", "beautiful", "pleasure", "enjoy", "fun",
    "yes", "sure", "smart", "well",
];
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "wrong", "terrible", "awful", "horrible", "hate", "dislike", "worse", "worst",
    "stupid", "annoying", "angry", "sad", "upset", "disagree", "problem", "fail", "failed",
    "useless", "boring", "poor", "ugly", "mess", "confused", "confusing", "difficult", "hard",
    "unfortunately", "no", "not",
];
const SUBJUNCTIVE_PHRASES: &[&str] = &["could you", "would you"];
const INDICATIVE_PHRASES: &[&str] = &["can you", "will you"];

/// Emits one indicator column per politeness strategy.
///
/// Empty or whitespace-only messages produce an empty record, which lays out
/// as all zeros.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolitenessStrategies;

impl ChatFeature for PolitenessStrategies {
    fn name(&self) -> &str {
        "politeness_strategies"
    }

    fn fields(&self) -> &[FieldSpec] {
        FIELDS.as_slice()
    }

    fn input(&self) -> TextVariant {
        TextVariant::LowerWithPunctuation
    }

    fn compute(&self, message: &str) -> Result<FeatureRecord, FeatureFailure> {
        let text = message.trim();
        if text.is_empty() {
            return Ok(FeatureRecord::new());
        }
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()).collect();
        let markers = Markers::new(&tokens);

        let values = [
            markers.rest_has(&["please"]),
            markers.starts_with(&["please"]),
            markers.has(HEDGE_WORDS) || markers.has_phrase(HEDGE_PHRASES),
            markers.has(&["btw"]) || markers.has_phrase(&["by the way"]),
            markers.has_bigram(&["i", "we"], HEDGE_VERBS),
            markers.has(FACTUALITY_WORDS) || markers.has_phrase(FACTUALITY_PHRASES),
            markers.starts_with(DEFERENCE_STARTS),
            markers.has_prefix("thank") || markers.has(GRATITUDE_WORDS),
            markers.has(APOLOGY_WORDS),
            markers.has(FIRST_PERSON_PLURAL),
            markers.rest_has(FIRST_PERSON),
            markers.starts_with(FIRST_PERSON),
            markers.rest_has(SECOND_PERSON),
            markers.starts_with(SECOND_PERSON),
            markers.starts_with(GREETINGS),
            markers.starts_with(QUESTION_STARTS),
            markers.starts_with(DIRECT_STARTS),
            markers.has(POSITIVE_WORDS),
            markers.has(NEGATIVE_WORDS),
            markers.has_phrase(SUBJUNCTIVE_PHRASES),
            markers.has_phrase(INDICATIVE_PHRASES),
        ];

        Ok(POLITENESS_STRATEGIES
            .iter()
            .zip(values)
            .fold(FeatureRecord::new(), |record, (name, hit)| {
                record.with(*name, hit)
            }))
    }
}

struct Markers<'a> {
    tokens: &'a [&'a str],
}

impl<'a> Markers<'a> {
    fn new(tokens: &'a [&'a str]) -> Self {
        Self { tokens }
    }

    fn has(&self, words: &[&str]) -> bool {
        self.tokens.iter().any(|t| words.contains(t))
    }

    fn rest_has(&self, words: &[&str]) -> bool {
        self.tokens.iter().skip(1).any(|t| words.contains(t))
    }

    fn starts_with(&self, words: &[&str]) -> bool {
        self.tokens.first().is_some_and(|t| words.contains(t))
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.tokens.iter().any(|t| t.starts_with(prefix))
    }

    fn has_bigram(&self, first: &[&str], second: &[&str]) -> bool {
        self.tokens
            .windows(2)
            .any(|w| first.contains(&w[0]) && second.contains(&w[1]))
    }

    fn has_phrase(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|phrase| {
            let words: Vec<&str> = phrase.split(' ').collect();
            self.tokens.windows(words.len()).any(|w| w == words.as_slice())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn marker(message: &str, name: &str) -> i64 {
        let record = PolitenessStrategies.compute(message).unwrap();
        match record.get(name) {
            Some(Value::Int(v)) => *v,
            other => panic!("unexpected value for {name}: {other:?}"),
        }
    }

    #[test]
    fn test_empty_message_yields_empty_record() {
        assert!(PolitenessStrategies.compute("").unwrap().is_empty());
        assert!(PolitenessStrategies.compute("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_empty_record_lays_out_as_zeros() {
        let record = PolitenessStrategies.compute("").unwrap();
        let values = record.layout(PolitenessStrategies.fields()).unwrap();
        assert_eq!(values.len(), POLITENESS_STRATEGIES.len());
        assert!(values.iter().all(|v| *v == Value::Int(0)));
    }

    #[test]
    fn test_full_record_for_non_empty_message() {
        let record = PolitenessStrategies.compute("ok").unwrap();
        assert_eq!(record.len(), POLITENESS_STRATEGIES.len());
    }

    #[test]
    fn test_polite_request() {
        let msg = "could you please help me? thanks!";
        assert_eq!(marker(msg, "subjunctive"), 1);
        assert_eq!(marker(msg, "please"), 1);
        assert_eq!(marker(msg, "please_start"), 0);
        assert_eq!(marker(msg, "gratitude"), 1);
        assert_eq!(marker(msg, "1st_person"), 1);
        assert_eq!(marker(msg, "2nd_person"), 1);
        assert_eq!(marker(msg, "indicative"), 0);
    }

    #[test]
    fn test_start_markers() {
        assert_eq!(marker("please stop", "please_start"), 1);
        assert_eq!(marker("please stop", "please"), 0);
        assert_eq!(marker("hi there", "indirect_(greeting)"), 1);
        assert_eq!(marker("why is this broken?", "direct_question"), 1);
        assert_eq!(marker("so what now", "direct_start"), 1);
        assert_eq!(marker("i'm here", "1st_person_start"), 1);
        assert_eq!(marker("you did it", "2nd_person_start"), 1);
        assert_eq!(marker("great idea", "deference"), 1);
    }

    #[test]
    fn test_hedges_and_factuality() {
        assert_eq!(marker("i think it is sort of fine", "hedges"), 1);
        assert_eq!(marker("i think it is sort of fine", "hashedge"), 1);
        assert_eq!(marker("in fact it works", "factuality"), 1);
        assert_eq!(marker("by the way, lunch is here", "indirect_(btw)"), 1);
        assert_eq!(marker("sorry about that", "apologizing"), 1);
        assert_eq!(marker("let's go together", "1st_person_pl."), 1);
    }

    #[test]
    fn test_sentiment_markers() {
        assert_eq!(marker("that was awesome", "haspositive"), 1);
        assert_eq!(marker("that was awesome", "hasnegative"), 0);
        assert_eq!(marker("this is terrible", "hasnegative"), 1);
    }
}
