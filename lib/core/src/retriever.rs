//! Brute-force top-K retrieval

use crate::vector::Vector;
use serde::Serialize;

/// A candidate position and its raw similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredIndex {
    pub index: usize,
    pub score: f64,
}

/// Score every present candidate against `query` and keep the best `k`.
///
/// The query is normalized before scoring; candidates are expected to be unit
/// vectors already. `None` candidates and the `exclude` position are skipped.
/// Equal scores keep their candidate order.
pub fn top_k<'a, I>(query: &Vector, candidates: I, k: usize, exclude: Option<usize>) -> Vec<ScoredIndex>
where
    I: IntoIterator<Item = Option<&'a Vector>>,
{
    let q = query.normalized();

    let mut scored: Vec<ScoredIndex> = candidates
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != exclude)
        .filter_map(|(index, cand)| {
            cand.map(|c| ScoredIndex {
                index,
                score: q.dot(c),
            })
        })
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
