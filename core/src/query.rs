use crate::phrase::phrase_matches;
use crate::scoring::{tf_idf_with, IdfMode};
use crate::tokenizer::Tokenizer;
use crate::{DocId, SearchIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// Ranking knobs. The defaults reproduce plain TF-IDF with a 1.5x phrase bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Multiplier for documents containing the whole query as a phrase.
    pub phrase_boost: f64,
    /// Display rescaling applied to every accumulated score.
    pub score_scale: f64,
    pub idf_mode: IdfMode,
    /// Keep documents whose terms all carry zero IDF.
    pub keep_zero_scores: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { phrase_boost: 1.5, score_scale: 1.0, idf_mode: IdfMode::Standard, keep_zero_scores: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
    pub phrase_match: bool,
}

/// Tokenizer, index and ranking config for one read-only query session.
pub struct QueryEngine {
    index: SearchIndex,
    tokenizer: Tokenizer,
    config: SearchConfig,
}

impl QueryEngine {
    pub fn new(index: SearchIndex, tokenizer: Tokenizer, config: SearchConfig) -> Self {
        Self { index, tokenizer, config }
    }

    pub fn index(&self) -> &SearchIndex { &self.index }

    /// Rank every matching document, best first. Ties go to the lexically smaller id.
    pub fn query(&self, raw_query: &str) -> Vec<ScoredDoc> {
        let terms = self.tokenizer.tokenize(raw_query);
        if terms.is_empty() {
            tracing::debug!(raw_query, "query has no index terms");
            return Vec::new();
        }

        let total_docs = self.index.num_docs();
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for term in &terms {
            for doc_id in self.index.inverted.documents(term) {
                *scores.entry(doc_id).or_insert(0.0) += tf_idf_with(
                    term,
                    doc_id,
                    &self.index.term_frequency,
                    &self.index.document_frequency,
                    total_docs,
                    self.config.idf_mode,
                );
            }
        }

        // a lone term is trivially its own phrase
        let phrase_hits: BTreeSet<DocId> = if terms.len() > 1 {
            phrase_matches(&terms, &self.index.inverted)
        } else {
            BTreeSet::new()
        };

        let mut ranked: Vec<ScoredDoc> = scores
            .into_iter()
            .map(|(doc_id, raw)| {
                let phrase_match = phrase_hits.contains(doc_id);
                let mut score = raw * self.config.score_scale;
                if phrase_match {
                    score *= self.config.phrase_boost;
                }
                ScoredDoc { doc_id: doc_id.to_string(), score, phrase_match }
            })
            .filter(|hit| self.config.keep_zero_scores || hit.score > 0.0)
            .collect();
        ranked.sort_by(rank_order);

        tracing::debug!(terms = terms.len(), hits = ranked.len(), phrase_hits = phrase_hits.len(), "query ranked");
        ranked
    }

    /// [`QueryEngine::query`] truncated to the best `k`.
    pub fn search(&self, raw_query: &str, k: usize) -> Vec<ScoredDoc> {
        let mut ranked = self.query(raw_query);
        ranked.truncate(k);
        ranked
    }
}

fn rank_order(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id))
}
