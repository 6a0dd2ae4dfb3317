use criterion::{criterion_group, criterion_main, Criterion};
use neardup_core::tokenizer::tokenize;
use neardup_core::{Document, MemoryStore, SimilarityConfig, SimilarityEngine};
use std::sync::Arc;

const WORDS: &[&str] = &[
    "market", "bank", "interest", "rate", "football", "team", "recipe", "chocolate", "weather", "storm",
    "election", "vote", "science", "space", "rocket", "music", "concert", "travel", "train", "city",
];

fn corpus(size: usize) -> Vec<Document> {
    (0..size)
        .map(|i| {
            let text: Vec<&str> = (0..12).map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()]).collect();
            let text = text.join(" ");
            Document::new(i as u64 + 1, text.clone(), tokenize(&text))
        })
        .collect()
}

fn bench_similarity(c: &mut Criterion) {
    let docs = corpus(200);
    c.bench_function("tokenize_sentence", |b| b.iter(|| tokenize("The central bank raised interest rates again")));
    c.bench_function("init_200", |b| {
        b.iter(|| {
            let engine = SimilarityEngine::new(Arc::new(MemoryStore::new()), SimilarityConfig::default());
            engine.init(docs.clone()).unwrap();
        })
    });

    let engine = SimilarityEngine::new(Arc::new(MemoryStore::new()), SimilarityConfig::default());
    engine.init(docs.clone()).unwrap();
    let probe = Document::new(10_000, "", tokenize("bank interest rate election vote"));
    c.bench_function("score_all_200", |b| b.iter(|| engine.score_all(&probe).unwrap()));
    c.bench_function("add_remove_200", |b| {
        b.iter(|| {
            engine.add(probe.clone()).unwrap();
            engine.remove(probe.id).unwrap();
        })
    });
}

criterion_group!(benches, bench_similarity);
criterion_main!(benches);
