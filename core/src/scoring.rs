use crate::{DocumentFrequencyTable, TermFrequencyTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdfMode {
    /// ln(N / df)
    #[default]
    Standard,
    /// ln(1 + N / df)
    Smoothed,
}

/// Inverse document frequency. Zero when the term occurs nowhere.
pub fn idf(document_frequency: u32, total_docs: usize, mode: IdfMode) -> f64 {
    if document_frequency == 0 || total_docs == 0 {
        return 0.0;
    }
    let ratio = total_docs as f64 / document_frequency as f64;
    match mode {
        IdfMode::Standard => ratio.ln(),
        IdfMode::Smoothed => (1.0 + ratio).ln(),
    }
}

/// TF-IDF weight of `term` in `doc_id`; never negative.
pub fn tf_idf(
    term: &str,
    doc_id: &str,
    term_frequency: &TermFrequencyTable,
    document_frequency: &DocumentFrequencyTable,
    total_docs: usize,
) -> f64 {
    tf_idf_with(term, doc_id, term_frequency, document_frequency, total_docs, IdfMode::Standard)
}

pub fn tf_idf_with(
    term: &str,
    doc_id: &str,
    term_frequency: &TermFrequencyTable,
    document_frequency: &DocumentFrequencyTable,
    total_docs: usize,
    mode: IdfMode,
) -> f64 {
    let tf = term_frequency.get(doc_id, term);
    let df = document_frequency.get(term);
    if tf <= 0.0 || df == 0 {
        return 0.0;
    }
    // df can only exceed N when the tables come from different corpora
    (tf * idf(df, total_docs, mode)).max(0.0)
}
