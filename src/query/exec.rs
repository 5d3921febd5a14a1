use crate::collection::Collection;
use crate::document::Document;

use super::eval::{distance_from, eval_filter};
use super::types::{Filter, FindOptions};

/// Matching documents in insertion order, or nearest-first when the filter
/// carries a proximity clause, sliced by `skip`/`limit`.
pub fn find_docs(col: &Collection, filter: &Filter, opts: &FindOptions) -> Vec<Document> {
    let bench_start = std::time::Instant::now();
    let mut docs = col.matching(|d| eval_filter(&d.data, filter));

    if let Some((path, point)) = filter.near_clause() {
        let mut keyed: Vec<(f64, Document)> = docs
            .into_iter()
            .map(|d| (distance_from(&d.data, path, &point).unwrap_or(f64::INFINITY), d))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        docs = keyed.into_iter().map(|(_, d)| d).collect();
    }

    let matched = docs.len();
    let skip = opts.skip.unwrap_or(0);
    let limit = opts.limit.unwrap_or(usize::MAX);
    let page: Vec<Document> = docs.into_iter().skip(skip).take(limit).collect();
    log::debug!(
        "find on '{}': matched={} returned={} skip={} limit={:?} in {}us",
        col.name(),
        matched,
        page.len(),
        skip,
        opts.limit,
        bench_start.elapsed().as_micros()
    );
    page
}

#[must_use]
pub fn count_docs(col: &Collection, filter: &Filter) -> usize {
    col.count_matching(|d| eval_filter(&d.data, filter))
}
