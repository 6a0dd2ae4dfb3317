use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

const STOPWORDS: &[&str] = &[
    // determiners and qualifiers
    "a", "an", "the", "this", "that", "these", "those", "each", "few", "all", "any", "both", "some",
    "such", "same", "own", "other", "more", "most", "no", "nor", "not", "only", "very", "too", "so",
    // pronouns
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours", "yourself",
    "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself", "it", "its",
    "itself", "they", "them", "their", "theirs", "themselves", "what", "which", "who", "whom",
    // auxiliaries
    "am", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having", "do",
    "does", "did", "doing", "can", "cannot", "could", "ought", "should", "would",
    // prepositions and conjunctions
    "about", "above", "after", "again", "against", "and", "as", "at", "because", "before", "below",
    "between", "but", "by", "down", "during", "for", "from", "further", "here", "how", "if", "in",
    "into", "of", "off", "on", "once", "or", "out", "over", "than", "then", "there", "through",
    "to", "under", "until", "up", "when", "where", "while", "why", "with",
    // contractions
    "aren't", "can't", "couldn't", "didn't", "doesn't", "don't", "hadn't", "hasn't", "haven't",
    "he'd", "he'll", "he's", "here's", "how's", "i'd", "i'll", "i'm", "i've", "isn't", "it's",
    "let's", "mustn't", "she'd", "she'll", "she's", "shouldn't", "that's", "there's", "they'd",
    "they'll", "they're", "they've", "wasn't", "we'd", "we'll", "we're", "we've", "weren't",
    "what's", "when's", "where's", "who's", "why's", "won't", "wouldn't", "you'd", "you'll",
    "you're", "you've",
];

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORD_SET: HashSet<&'static str> = STOPWORDS.iter().copied().collect();
}

/// Turns raw text into the ordered token sequence the similarity engine consumes.
///
/// Implementations must be deterministic: the same text always yields the same tokens,
/// otherwise a document re-tokenized on removal would not match what was registered.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// NFKC normalization, lowercase, stopword removal and English stemming.
#[derive(Debug, Default, Clone, Copy)]
pub struct StemmingTokenizer;

impl Tokenizer for StemmingTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}

fn is_stopword(token: &str) -> bool { STOPWORD_SET.contains(token) }

/// Tokenize text into stemmed terms, preserving order and repeats.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if is_stopword(token) { continue; }
        tokens.push(STEMMER.stem(token).to_string());
    }
    tokens
}
