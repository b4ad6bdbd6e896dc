use crate::{DocId, InvertedIndex};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Documents containing `terms` contiguously and in order.
///
/// Keeps, for every candidate document, the positions where the matched
/// prefix ends, and extends them one term at a time.
pub fn phrase_matches(terms: &[String], index: &InvertedIndex) -> BTreeSet<DocId> {
    let Some((first, rest)) = terms.split_first() else {
        return BTreeSet::new();
    };

    let mut candidates: HashMap<&str, HashSet<u32>> = index.positions(first);
    for term in rest {
        if candidates.is_empty() {
            break;
        }
        let next = index.positions(term);
        candidates = candidates
            .into_iter()
            .filter_map(|(doc, ends)| {
                let positions = next.get(doc)?;
                let extended: HashSet<u32> = ends
                    .iter()
                    .map(|end| end + 1)
                    .filter(|p| positions.contains(p))
                    .collect();
                (!extended.is_empty()).then_some((doc, extended))
            })
            .collect();
    }

    candidates.into_keys().map(str::to_string).collect()
}
