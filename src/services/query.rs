//! Filter/query engine over the in-memory dataset.
//!
//! A single linear pass; the dataset is never mutated and each call returns a fresh view.

use std::{cmp::Ordering, collections::BTreeSet};

use crate::models::{PredicateSet, SortOrder, TitleRecord};

/// Returns the records that satisfy every active predicate, in dataset order
pub fn query<'a>(dataset: &'a [TitleRecord], predicates: &PredicateSet) -> Vec<&'a TitleRecord> {
    let compiled = Compiled::new(predicates);
    dataset.iter().filter(|record| compiled.matches(record)).collect()
}

/// Whether a single record passes the predicate set
pub fn matches(record: &TitleRecord, predicates: &PredicateSet) -> bool {
    Compiled::new(predicates).matches(record)
}

/// Sorts a view in place; records lacking the sort key always go last
pub fn sort(view: &mut [&TitleRecord], order: SortOrder) {
    match order {
        SortOrder::RatingDesc => view.sort_by(|a, b| {
            missing_last(a.rating.map(|r| r.value()), b.rating.map(|r| r.value()), true)
        }),
        SortOrder::RatingAsc => view.sort_by(|a, b| {
            missing_last(a.rating.map(|r| r.value()), b.rating.map(|r| r.value()), false)
        }),
        SortOrder::TitleAsc => view.sort_by_cached_key(|r| r.title.to_lowercase()),
        SortOrder::TitleDesc => {
            view.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
        SortOrder::ReleaseNewest => {
            view.sort_by(|a, b| missing_last(release_key(a), release_key(b), true))
        }
        SortOrder::ReleaseOldest => {
            view.sort_by(|a, b| missing_last(release_key(a), release_key(b), false))
        }
    }
}

/// Predicates lowercased once per query rather than once per record
struct Compiled {
    title_contains: Option<String>,
    platforms: BTreeSet<String>,
    genres: BTreeSet<String>,
    predicates: PredicateSet,
}

impl Compiled {
    fn new(predicates: &PredicateSet) -> Self {
        Self {
            title_contains: predicates
                .title_contains
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            platforms: lowercase_set(&predicates.platforms),
            genres: lowercase_set(&predicates.genres),
            predicates: predicates.clone(),
        }
    }

    fn matches(&self, record: &TitleRecord) -> bool {
        if let Some(needle) = &self.title_contains {
            if !record.title.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }

        if !intersects(&self.platforms, &record.platforms) {
            return false;
        }

        if !intersects(&self.genres, &record.genres) {
            return false;
        }

        if !self.predicates.types.is_empty() && !self.predicates.types.contains(&record.title_type)
        {
            return false;
        }

        let rating = record.rating.map(|r| r.value());
        if let Some(min) = self.predicates.min_rating {
            if !rating.is_some_and(|r| r >= min) {
                return false;
            }
        }
        if let Some(max) = self.predicates.max_rating {
            if !rating.is_some_and(|r| r <= max) {
                return false;
            }
        }

        true
    }
}

fn lowercase_set(values: &BTreeSet<String>) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Empty filter passes everything; otherwise at least one shared value is required
fn intersects(wanted: &BTreeSet<String>, have: &BTreeSet<String>) -> bool {
    wanted.is_empty() || have.iter().any(|v| wanted.contains(&v.to_lowercase()))
}

fn release_key(record: &TitleRecord) -> Option<String> {
    record
        .release_date
        .clone()
        .or_else(|| record.year.map(|y| format!("{:04}", y)))
}

fn missing_last<T: PartialOrd>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
