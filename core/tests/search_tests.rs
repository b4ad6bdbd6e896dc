use quarry_core::persist::{load_index, save_index, IndexFormat, IndexPaths, MetaFile, FORMAT_VERSION};
use quarry_core::scoring::tf_idf;
use quarry_core::tokenizer::{Tokenizer, TokenizerConfig};
use quarry_core::{Corpus, QueryEngine, SearchConfig, SearchIndex};
use tempfile::tempdir;

fn corpus_from_text(tok: &Tokenizer, docs: &[(&str, &str)]) -> Corpus {
    docs.iter().map(|(id, text)| (id.to_string(), tok.tokenize(text))).collect()
}

fn library() -> Vec<(&'static str, &'static str)> {
    vec![
        ("rust-book", "The Rust programming language book teaches ownership and borrowing."),
        ("python-guide", "A guide to the Python programming language for data science."),
        ("gardening", "Growing tomatoes in a small garden requires sun and water."),
        ("ownership", "Borrowing rules and ownership in Rust prevent data races."),
    ]
}

#[test]
fn frequency_tables_hold_their_invariants() {
    let tok = Tokenizer::default();
    let corpus = corpus_from_text(&tok, &library());
    let index = SearchIndex::build(&corpus);
    let n = index.num_docs();
    for (term, df) in index.document_frequency.iter() {
        assert!(df >= 1 && df as usize <= n, "{term} has df {df}");
    }
    for (doc, tokens) in &corpus {
        let tf = index.term_frequency.document(doc).unwrap();
        let raw: f64 = tf.values().map(|f| f * tokens.len() as f64).sum();
        assert!((raw - tokens.len() as f64).abs() < 1e-9);
        for term in index.inverted.terms() {
            if !tokens.iter().any(|t| t == term) {
                assert_eq!(index.term_frequency.get(doc, term), 0.0);
                assert_eq!(tf_idf(term, doc, &index.term_frequency, &index.document_frequency, n), 0.0);
            }
        }
    }
}

#[test]
fn ranking_is_strictly_descending_for_unequal_scores() {
    let tok = Tokenizer::default();
    let index = SearchIndex::build(&corpus_from_text(&tok, &library()));
    let engine = QueryEngine::new(index, tok, SearchConfig::default());
    let ranked = engine.query("rust borrowing data");
    assert!(ranked.len() >= 2);
    for pair in ranked.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(ranked[0].score > ranked[ranked.len() - 1].score);
}

#[test]
fn phrase_query_prefers_exact_order() {
    let tok = Tokenizer::default();
    let index = SearchIndex::build(&corpus_from_text(&tok, &library()));
    let engine = QueryEngine::new(index, tok, SearchConfig::default());
    let ranked = engine.query("programming language");
    let hits: Vec<&str> = ranked.iter().filter(|h| h.phrase_match).map(|h| h.doc_id.as_str()).collect();
    assert_eq!(hits, vec!["python-guide", "rust-book"]);
}

#[test]
fn term_in_every_document_contributes_nothing() {
    let tok = Tokenizer::default();
    let docs = [("a", "shared apples"), ("b", "shared bananas"), ("c", "shared cherries")];
    let index = SearchIndex::build(&corpus_from_text(&tok, &docs));
    let engine = QueryEngine::new(index, tok, SearchConfig::default());
    let ranked = engine.query("shared");
    assert_eq!(ranked.len(), 3);
    assert!(ranked.iter().all(|h| h.score == 0.0));
}

#[test]
fn persisted_index_answers_like_fresh_one() {
    let tok = Tokenizer::default();
    let index = SearchIndex::build(&corpus_from_text(&tok, &library()));
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let meta = MetaFile {
        num_docs: index.num_docs(),
        created_at: "2024-01-01T00:00:00Z".into(),
        version: FORMAT_VERSION,
        format: IndexFormat::Bincode,
        tokenizer: tok.config().clone(),
    };
    save_index(&paths, &index, &meta).unwrap();
    let fresh = QueryEngine::new(index, tok, SearchConfig::default()).query("data science");

    let (loaded, meta) = load_index(&paths).unwrap();
    let engine = QueryEngine::new(loaded, Tokenizer::new(meta.tokenizer), SearchConfig::default());
    assert_eq!(engine.query("data science"), fresh);
}

#[test]
fn unstemmed_tokenizer_reaches_raw_word_corpus() {
    let words = ["index", "ranking", "document", "frequency"];
    let corpus: Corpus = (0..4)
        .map(|d| {
            let tokens: Vec<String> = (0..8).map(|i| words[(d + i) % words.len()].to_string()).collect();
            (format!("doc{d}"), tokens)
        })
        .collect();
    let index = SearchIndex::build(&corpus);

    let stemming = Tokenizer::default();
    let terms = stemming.tokenize("ranking frequency");
    assert!(terms.iter().any(|t| index.inverted.postings(t).is_empty()));

    let raw = Tokenizer::new(TokenizerConfig { stem: false, ..Default::default() });
    let engine = QueryEngine::new(index, raw, SearchConfig::default());
    let ranked = engine.query("index ranking document");
    assert_eq!(ranked.len(), 4);
    assert!(ranked.iter().all(|h| h.phrase_match));
}
