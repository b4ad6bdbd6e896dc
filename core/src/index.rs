use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub type DocId = String;

/// Document id -> normalized token sequence. Iteration order is lexical by id.
pub type Corpus = BTreeMap<DocId, Vec<String>>;

/// One occurrence of a term: stored on disk as a `[doc_id, position]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(DocId, u32)", into = "(DocId, u32)")]
pub struct Posting {
    pub doc_id: DocId,
    pub position: u32,
}

impl From<(DocId, u32)> for Posting {
    fn from((doc_id, position): (DocId, u32)) -> Self { Self { doc_id, position } }
}

impl From<Posting> for (DocId, u32) {
    fn from(p: Posting) -> Self { (p.doc_id, p.position) }
}

/// term -> postings in document order, then position order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    /// Postings for `term`; empty when the term never occurs.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> + '_ { self.postings.keys().map(String::as_str) }

    /// Distinct documents containing `term`, in postings order.
    pub fn documents(&self, term: &str) -> Vec<&str> {
        let mut docs: Vec<&str> = Vec::new();
        for p in self.postings(term) {
            if docs.last() != Some(&p.doc_id.as_str()) {
                docs.push(&p.doc_id);
            }
        }
        docs
    }

    /// Occurrence positions of `term` grouped by document.
    pub fn positions(&self, term: &str) -> HashMap<&str, HashSet<u32>> {
        let mut by_doc: HashMap<&str, HashSet<u32>> = HashMap::new();
        for p in self.postings(term) {
            by_doc.entry(p.doc_id.as_str()).or_default().insert(p.position);
        }
        by_doc
    }

    fn push(&mut self, term: &str, doc_id: &str, position: u32) {
        self.postings
            .entry(term.to_string())
            .or_default()
            .push(Posting { doc_id: doc_id.to_string(), position });
    }
}

/// doc -> term -> (raw count / document length).
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermFrequencyTable {
    docs: HashMap<DocId, HashMap<String, f64>>,
}

impl TermFrequencyTable {
    /// Normalized frequency of `term` in `doc_id`, 0.0 when either is absent.
    pub fn get(&self, doc_id: &str, term: &str) -> f64 {
        self.docs
            .get(doc_id)
            .and_then(|terms| terms.get(term))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn document(&self, doc_id: &str) -> Option<&HashMap<String, f64>> { self.docs.get(doc_id) }

    /// Every indexed document, including those with no tokens.
    pub fn num_docs(&self) -> usize { self.docs.len() }
}

/// term -> number of documents containing it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentFrequencyTable {
    counts: HashMap<String, u32>,
}

impl DocumentFrequencyTable {
    /// Document frequency of `term`, 0 when absent.
    pub fn get(&self, term: &str) -> u32 { self.counts.get(term).copied().unwrap_or(0) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.counts.iter().map(|(t, c)| (t.as_str(), *c))
    }
}

/// Raw term counts for one document, kept until its length is known.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentStats {
    pub counts: HashMap<String, u32>,
    pub length: usize,
}

impl DocumentStats {
    pub fn count(tokens: &[String]) -> Self {
        let mut stats = Self::default();
        for token in tokens {
            stats.record(token);
        }
        stats
    }

    /// Count one token. Returns true the first time the term is seen in this document.
    pub fn record(&mut self, token: &str) -> bool {
        self.length += 1;
        match self.counts.get_mut(token) {
            Some(raw) => {
                *raw += 1;
                false
            }
            None => {
                self.counts.insert(token.to_string(), 1);
                true
            }
        }
    }

    /// Divide each raw count by the document length. Empty documents give an empty map.
    pub fn normalize(&self) -> HashMap<String, f64> {
        if self.length == 0 {
            return HashMap::new();
        }
        let len = self.length as f64;
        self.counts
            .iter()
            .map(|(term, &raw)| (term.clone(), raw as f64 / len))
            .collect()
    }
}

/// The three read-only structures a query session works from.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchIndex {
    pub inverted: InvertedIndex,
    pub term_frequency: TermFrequencyTable,
    pub document_frequency: DocumentFrequencyTable,
}

impl SearchIndex {
    pub fn new(inverted: InvertedIndex, term_frequency: TermFrequencyTable, document_frequency: DocumentFrequencyTable) -> Self {
        Self { inverted, term_frequency, document_frequency }
    }

    /// Build all structures from scratch in one pass per document.
    pub fn build(corpus: &Corpus) -> Self {
        let mut index = Self::default();
        for (doc_id, tokens) in corpus {
            let mut stats = DocumentStats::default();
            for (pos, token) in tokens.iter().enumerate() {
                index.inverted.push(token, doc_id, pos as u32);
                if stats.record(token) {
                    *index.document_frequency.counts.entry(token.clone()).or_insert(0) += 1;
                }
            }
            index.term_frequency.docs.insert(doc_id.clone(), stats.normalize());
        }
        tracing::debug!(
            num_docs = index.num_docs(),
            num_terms = index.inverted.num_terms(),
            "built inverted index"
        );
        index
    }

    /// Corpus size used as the IDF numerator.
    pub fn num_docs(&self) -> usize { self.term_frequency.num_docs() }

    /// Token count of `doc_id`, recovered from the postings of its terms.
    pub fn doc_length(&self, doc_id: &str) -> Option<usize> {
        let terms = self.term_frequency.document(doc_id)?;
        let length = terms
            .keys()
            .map(|term| self.inverted.postings(term).iter().filter(|p| p.doc_id == doc_id).count())
            .sum();
        Some(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(docs: &[(&str, &[&str])]) -> Corpus {
        docs.iter()
            .map(|(id, toks)| (id.to_string(), toks.iter().map(|t| t.to_string()).collect()))
            .collect()
    }

    #[test]
    fn builds_all_three_tables() {
        let c = corpus(&[("d1", &["cat", "dog"]), ("d2", &["dog", "dog", "bird"])]);
        let idx = SearchIndex::build(&c);
        assert_eq!(idx.num_docs(), 2);
        assert_eq!(idx.document_frequency.get("cat"), 1);
        assert_eq!(idx.document_frequency.get("dog"), 2);
        assert_eq!(idx.document_frequency.get("bird"), 1);
        assert!((idx.term_frequency.get("d2", "dog") - 2.0 / 3.0).abs() < 1e-12);
        let dog: Vec<(DocId, u32)> = idx.inverted.postings("dog").iter().cloned().map(Into::into).collect();
        assert_eq!(dog, vec![("d1".into(), 1), ("d2".into(), 0), ("d2".into(), 1)]);
    }

    #[test]
    fn postings_point_at_real_occurrences() {
        let c = corpus(&[("a", &["x", "y", "x"]), ("b", &["y", "z"])]);
        let idx = SearchIndex::build(&c);
        for term in idx.inverted.terms() {
            for p in idx.inverted.postings(term) {
                assert_eq!(c[&p.doc_id][p.position as usize], term);
            }
        }
    }

    #[test]
    fn empty_document_has_empty_stats() {
        let c = corpus(&[("empty", &[]), ("full", &["word"])]);
        let idx = SearchIndex::build(&c);
        assert_eq!(idx.num_docs(), 2);
        assert!(idx.term_frequency.document("empty").unwrap().is_empty());
        assert_eq!(idx.document_frequency.get("word"), 1);
    }

    #[test]
    fn raw_counts_sum_to_length() {
        let tokens: Vec<String> = ["a", "b", "a", "c", "a"].iter().map(|s| s.to_string()).collect();
        let stats = DocumentStats::count(&tokens);
        assert_eq!(stats.counts.values().sum::<u32>() as usize, stats.length);
        let total: f64 = stats.normalize().values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn record_flags_first_sighting_only() {
        let mut stats = DocumentStats::default();
        assert!(stats.record("a"));
        assert!(!stats.record("a"));
        assert!(stats.record("b"));
        assert_eq!(stats.length, 3);
        assert_eq!(stats.counts["a"], 2);
    }

    #[test]
    fn doc_length_counts_every_token() {
        let c = corpus(&[("d1", &["cat", "dog"]), ("d2", &["dog", "dog", "bird"]), ("e", &[])]);
        let idx = SearchIndex::build(&c);
        assert_eq!(idx.doc_length("d2"), Some(3));
        assert_eq!(idx.doc_length("d1"), Some(2));
        assert_eq!(idx.doc_length("e"), Some(0));
        assert_eq!(idx.doc_length("ghost"), None);
    }

    #[test]
    fn missing_lookups_are_zero() {
        let idx = SearchIndex::build(&corpus(&[("d", &["only"])]));
        assert_eq!(idx.term_frequency.get("d", "nope"), 0.0);
        assert_eq!(idx.term_frequency.get("ghost", "only"), 0.0);
        assert_eq!(idx.document_frequency.get("nope"), 0);
        assert!(idx.inverted.postings("nope").is_empty());
    }

    #[test]
    fn rebuild_is_identical() {
        let c = corpus(&[("d1", &["a", "b"]), ("d2", &["b", "c", "b"])]);
        assert_eq!(SearchIndex::build(&c), SearchIndex::build(&c));
    }

    #[test]
    fn postings_serialize_as_pairs() {
        let json = serde_json::to_string(&Posting { doc_id: "d1".into(), position: 3 }).unwrap();
        assert_eq!(json, r#"["d1",3]"#);
    }
}
