//! Query engine over a built [`AdvisoryStore`].
//!
//! All functions are synchronous and read-only. "Not found" and "no matches"
//! are ordinary results (`None` / empty `Vec`), never errors.

mod date;
mod filter;

pub use date::DateFilter;
pub use filter::Predicates;

use std::cmp::Ordering;

use crate::index::AdvisoryStore;
use crate::model::{Advisory, AdvisoryListOptions, SearchOptions, SortDirection, SortField};

/// Filters, sorts and paginates the store.
///
/// The sort is stable: advisories with equal sort keys keep their store
/// order. Pages past the end yield an empty `Vec`.
pub fn list(store: &AdvisoryStore, options: &AdvisoryListOptions) -> Vec<Advisory> {
    let predicates = Predicates::for_list(options);
    let mut matched: Vec<&Advisory> = store.iter().filter(|a| predicates.matches(a)).collect();

    sort(&mut matched, options.sort, options.direction);

    let page = options.page.max(1);
    let start = (page - 1).saturating_mul(options.per_page);
    matched
        .into_iter()
        .skip(start)
        .take(options.per_page)
        .cloned()
        .collect()
}

/// Exact lookup by primary identifier.
pub fn get(store: &AdvisoryStore, ghsa_id: &str) -> Option<Advisory> {
    store.get(ghsa_id).cloned()
}

/// Case-insensitive substring search over summary, description and both
/// identifiers, narrowed by ecosystem and severity and truncated to
/// `per_page`. Results keep store order.
pub fn search(store: &AdvisoryStore, query: &str, options: &SearchOptions) -> Vec<Advisory> {
    let predicates = Predicates::for_search(query, options);
    store
        .iter()
        .filter(|a| predicates.matches(a))
        .take(options.per_page)
        .cloned()
        .collect()
}

fn sort(advisories: &mut [&Advisory], field: SortField, direction: SortDirection) {
    advisories.sort_by(|a, b| {
        let ordering: Ordering = sort_key(a, field).cmp(sort_key(b, field));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn sort_key(advisory: &Advisory, field: SortField) -> &str {
    match field {
        SortField::Published => &advisory.published_at,
        SortField::Updated => &advisory.updated_at,
    }
}
