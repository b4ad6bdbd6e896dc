use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quarry_core::tokenizer::{Tokenizer, TokenizerConfig};
use quarry_core::{Corpus, QueryEngine, SearchConfig, SearchIndex};

const WORDS: &[&str] = &[
    "index", "query", "phrase", "ranking", "term", "frequency", "document", "corpus",
    "stem", "token", "posting", "score", "search", "engine", "weight", "boost",
];

fn synthetic_corpus(docs: usize, len: usize) -> Corpus {
    (0..docs)
        .map(|d| {
            let tokens: Vec<String> = (0..len).map(|i| WORDS[(d * 7 + i * 3 + i / 5) % WORDS.len()].to_string()).collect();
            (format!("doc{d:05}"), tokens)
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let corpus = synthetic_corpus(500, 200);
    c.bench_function("build_500_docs", |b| b.iter(|| SearchIndex::build(black_box(&corpus))));
}

fn bench_query(c: &mut Criterion) {
    let index = SearchIndex::build(&synthetic_corpus(500, 200));
    // the synthetic corpus holds unstemmed words
    let tokenizer = Tokenizer::new(TokenizerConfig { stem: false, ..Default::default() });
    let engine = QueryEngine::new(index, tokenizer, SearchConfig::default());
    assert!(engine.query("index ranking document").iter().any(|h| h.phrase_match));
    c.bench_function("phrase_query", |b| b.iter(|| engine.query(black_box("index ranking document"))));
}

criterion_group!(benches, bench_build, bench_query);
criterion_main!(benches);
