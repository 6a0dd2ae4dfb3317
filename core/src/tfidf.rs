//! TF-IDF weighting and cosine similarity over sparse token vectors.

use crate::config::IdfMode;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse token -> weight map. Only tokens present in the document appear as keys.
pub type TfIdfVector = BTreeMap<String, f64>;

/// Dot products with magnitude below this score exactly zero.
pub const ZERO_DOT_TOLERANCE: f64 = 1e-5;

/// Compute the TF-IDF vector of a token sequence.
///
/// `tf = count / len(tokens)`, `idf = ln(corpus_size / max(df, 1))` (or the smoothed
/// variant). An empty token sequence or an empty corpus yields an empty vector.
pub fn compute_vector<F>(tokens: &[String], corpus_size: usize, idf: IdfMode, mut document_frequency: F) -> TfIdfVector
where
    F: FnMut(&str) -> usize,
{
    let mut vector = TfIdfVector::new();
    if tokens.is_empty() || corpus_size == 0 {
        return vector;
    }
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    let len = tokens.len() as f64;
    for (token, count) in counts {
        let tf = count as f64 / len;
        let df = document_frequency(token).max(1);
        vector.insert(token.to_string(), tf * idf.idf(corpus_size, df));
    }
    vector
}

/// `dot(v1, v2) / (|v1| * |v2|)`, or exactly 0 when `|dot| < 1e-5`.
///
/// # Panics
/// When the vectors differ in length: callers must [`align`] them first.
pub fn cosine_similarity(v1: &[f64], v2: &[f64]) -> f64 {
    assert_eq!(v1.len(), v2.len(), "cosine similarity needs vectors aligned over the same keys");
    let dot: f64 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    if dot.abs() < ZERO_DOT_TOLERANCE {
        return 0.0;
    }
    let n1 = v1.iter().map(|w| w * w).sum::<f64>().sqrt();
    let n2 = v2.iter().map(|w| w * w).sum::<f64>().sqrt();
    dot / (n1 * n2)
}

/// Lay two sparse vectors out over the union of their keys, filling gaps with 0.
pub fn align(a: &TfIdfVector, b: &TfIdfVector) -> (Vec<f64>, Vec<f64>) {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let left = keys.iter().map(|k| a.get(*k).copied().unwrap_or(0.0)).collect();
    let right = keys.iter().map(|k| b.get(*k).copied().unwrap_or(0.0)).collect();
    (left, right)
}

pub fn similarity(a: &TfIdfVector, b: &TfIdfVector) -> f64 {
    let (left, right) = align(a, b);
    cosine_similarity(&left, &right)
}
