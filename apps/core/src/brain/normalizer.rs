//! Text normalization.
//!
//! Turns raw user text into the lemma sequence the vectorizer consumes:
//! lower-case, tokenize, drop stop-words and punctuation, lemmatize.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Words, numbers, and words carrying clitics (`what's`, `don't`), or runs of punctuation.
// NOTE: expect() is acceptable here: the pattern is a compile-time constant.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}_]+(?:'\p{L}+)*|[^\s\p{L}\p{N}_]+")
        .expect("Invalid regex: token pattern")
});

/// Stopwords for English, clitics included.
const STOPWORDS_EN: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "mine", "yours", "hers", "ours", "theirs", "myself", "yourself", "himself", "herself",
    "itself", "ourselves", "themselves", "this", "that", "these", "those", "who", "whom",
    "which", "what", "whose", "whatever", "is", "am", "are", "was", "were", "be", "been",
    "being", "have", "has", "had", "having", "do", "does", "did", "doing", "will", "would",
    "shall", "should", "can", "could", "may", "might", "must", "in", "on", "at", "to", "from",
    "by", "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "up", "down", "out", "off", "over", "under", "again", "further", "here",
    "there", "where", "when", "why", "how", "all", "each", "every", "both", "few", "more", "most",
    "other", "some", "any", "no", "not", "only", "own", "same", "than", "too", "very", "just",
    "also", "now", "then", "once", "always", "never", "if", "because", "as", "until", "while",
    "although", "though", "yes", "maybe", "please", "of", "'s", "'re", "'ll", "'ve", "'m", "'d",
    "n't", "s", "t", "ve", "re", "ll", "d", "m",
];

/// Contractions split after the clitic.
const CLITICS: &[&str] = &["'s", "'re", "'ll", "'ve", "'m", "'d"];

/// Stems left by `n't` that are not words on their own.
const NEGATED_STEMS: &[(&str, &str)] = &[("ca", "can"), ("wo", "will"), ("sha", "shall"), ("ai", "am")];

/// Irregular forms mapped straight to their base form.
const IRREGULAR_FORMS: &[(&str, &str)] = &[
    ("went", "go"), ("gone", "go"), ("goes", "go"), ("going", "go"), ("ran", "run"),
    ("better", "good"), ("best", "good"), ("worse", "bad"), ("worst", "bad"),
    ("children", "child"), ("men", "man"), ("women", "woman"), ("people", "person"),
    ("feet", "foot"), ("teeth", "tooth"), ("mice", "mouse"), ("said", "say"), ("says", "say"),
    ("told", "tell"), ("thought", "think"), ("bought", "buy"), ("brought", "bring"),
    ("made", "make"), ("took", "take"), ("taken", "take"), ("gave", "give"), ("given", "give"),
    ("saw", "see"), ("seen", "see"), ("knew", "know"), ("known", "know"), ("got", "get"),
    ("gotten", "get"), ("felt", "feel"), ("left", "leave"), ("kept", "keep"),
    ("found", "find"), ("came", "come"), ("wrote", "write"), ("written", "write"),
    ("spoke", "speak"), ("spoken", "speak"), ("ate", "eat"), ("eaten", "eat"),
    ("sang", "sing"), ("sung", "sing"), ("began", "begin"), ("begun", "begin"),
    ("met", "meet"), ("sent", "send"), ("spent", "spend"), ("heard", "hear"),
    ("held", "hold"), ("stood", "stand"), ("understood", "understand"), ("lives", "life"),
    ("knives", "knife"), ("wives", "wife"), ("leaves", "leaf"), ("thanks", "thank"),
];

/// Words that look inflected but are already base forms.
const INVARIANT_WORDS: &[&str] = &[
    "morning", "evening", "thing", "nothing", "something", "anything", "everything", "king",
    "ring", "wing", "spring", "string", "sing", "bring", "ceiling", "wedding", "news", "series",
    "species", "always", "perhaps", "physics", "mathematics", "bus", "gas", "yes", "this",
    "his", "is", "was", "has", "does", "need", "speed", "feed", "seed", "weed", "bed", "red",
    "shed", "hundred", "sacred", "naked", "wicked", "wing", "ceiling", "anyway",
];

/// Capability turning raw text into normalized tokens.
pub trait TextNormalizer: Send + Sync + 'static {
    fn normalize(&self, text: &str) -> Vec<String>;

    /// Tokens joined by single spaces, the form stored in the training corpus.
    fn normalize_to_text(&self, text: &str) -> String {
        self.normalize(text).join(" ")
    }
}

/// Rule-based English normalizer.
pub struct EnglishNormalizer {
    stopwords: HashSet<&'static str>,
    irregular: HashMap<&'static str, &'static str>,
    invariant: HashSet<&'static str>,
}

impl Default for EnglishNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EnglishNormalizer {
    pub fn new() -> Self {
        Self {
            stopwords: STOPWORDS_EN.iter().copied().collect(),
            irregular: IRREGULAR_FORMS.iter().copied().collect(),
            invariant: INVARIANT_WORDS.iter().copied().collect(),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Splits raw (already lower-cased) text into word and punctuation tokens.
    fn tokenize(&self, text: &str) -> Vec<String> {
        TOKEN_PATTERN
            .find_iter(text)
            .flat_map(|m| split_clitics(m.as_str()))
            .collect()
    }

    /// Reduces a token to its dictionary base form.
    pub fn lemmatize(&self, token: &str) -> String {
        if let Some(base) = self.irregular.get(token) {
            return base.to_string();
        }
        if self.invariant.contains(token) || !token.chars().all(|c| c.is_alphabetic()) {
            return token.to_string();
        }

        let len = token.chars().count();
        if len <= 3 {
            return token.to_string();
        }

        if let Some(stem) = token.strip_suffix("ies") {
            if len > 4 {
                return format!("{}y", stem);
            }
        }
        if let Some(stem) = token.strip_suffix("sses") {
            return format!("{}ss", stem);
        }
        for suffix in ["ches", "shes", "xes", "zzes"] {
            if token.ends_with(suffix) {
                return token[..token.len() - 2].to_string();
            }
        }
        if token.ends_with('s')
            && !token.ends_with("ss")
            && !token.ends_with("us")
            && !token.ends_with("is")
            && !token.ends_with("ous")
        {
            return token[..token.len() - 1].to_string();
        }
        if let Some(stem) = token.strip_suffix("ing") {
            if stem.chars().count() >= 2 && stem.chars().any(is_vowel) {
                return restore_stem(stem);
            }
        }
        if let Some(stem) = token.strip_suffix("ed") {
            if !token.ends_with("eed") && stem.chars().count() >= 3 && stem.chars().any(is_vowel) {
                return restore_stem(stem);
            }
        }

        token.to_string()
    }
}

impl TextNormalizer for EnglishNormalizer {
    fn normalize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");

        self.tokenize(&lowered)
            .into_iter()
            .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
            .filter(|token| !self.is_stopword(token))
            .map(|token| self.lemmatize(&token))
            .filter(|lemma| !lemma.is_empty())
            .collect()
    }
}

/// `what's` -> `what`, `'s`; `don't` -> `do`, `n't`; `can't` -> `can`, `n't`.
/// Words without a known clitic (`o'clock`) stay whole.
fn split_clitics(word: &str) -> Vec<String> {
    if !word.contains('\'') {
        return vec![word.to_string()];
    }
    if let Some(stem) = word.strip_suffix("n't") {
        if !stem.is_empty() && !stem.contains('\'') {
            let base = NEGATED_STEMS
                .iter()
                .find(|(fragment, _)| *fragment == stem)
                .map_or(stem, |(_, base)| *base);
            return vec![base.to_string(), "n't".to_string()];
        }
    }
    for clitic in CLITICS {
        if let Some(stem) = word.strip_suffix(clitic) {
            if !stem.is_empty() && !stem.contains('\'') {
                return vec![stem.to_string(), clitic.to_string()];
            }
        }
    }
    vec![word.to_string()]
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Repairs a stem left by stripping `-ing`/`-ed`: undoubles a final
/// consonant (`runn` -> `run`) or restores a silent `e` (`mak` -> `make`).
fn restore_stem(stem: &str) -> String {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();

    if n >= 3 {
        let (a, b) = (chars[n - 2], chars[n - 1]);
        if a == b && !is_vowel(b) && !matches!(b, 'l' | 's' | 'z') {
            return chars[..n - 1].iter().collect();
        }
    }

    if n == 3 {
        let (c1, v, c2) = (chars[0], chars[1], chars[2]);
        if !is_vowel(c1) && is_vowel(v) && !is_vowel(c2) && !matches!(c2, 'w' | 'x' | 'y') {
            return format!("{}e", stem);
        }
    }

    stem.to_string()
}
