//! Record merger: joins the catalog and ratings collections on normalized title.
//!
//! The catalog defines the universe of titles. Each catalog record is matched against
//! ratings records with the same normalized title; when several share it, the one with
//! the closest year wins and ties go to the first encountered. Ratings records with no
//! catalog counterpart are dropped.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{attr, RawCollection, RawRecord, Rating, TitleRecord, TitleType, IMDB_SOURCE};

/// A catalog title that received no enrichment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoMatch {
    pub id: String,
    pub title: String,
}

/// A catalog record that could not become a title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    pub key: String,
    pub reason: String,
}

/// Output of a merge pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub records: Vec<TitleRecord>,
    pub unmatched: Vec<NoMatch>,
    pub rejected: Vec<RejectedRecord>,
}

/// Case-insensitive, trimmed form of a title used as the join key
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Merges the catalog with optional ratings into unified records
///
/// `secondary = None` means the ratings source failed or was not consulted; every
/// title then keeps only what the catalog itself carries.
pub fn merge(primary: &RawCollection, secondary: Option<&RawCollection>) -> MergeReport {
    let candidates = index_by_title(secondary);
    let mut report = MergeReport::default();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for raw in &primary.records {
        let mut record = match base_record(&primary.source, raw) {
            Ok(record) => record,
            Err(reason) => {
                tracing::debug!(key = %raw.key, reason = %reason, "Rejecting catalog record");
                report.rejected.push(RejectedRecord {
                    key: raw.key.clone(),
                    reason,
                });
                continue;
            }
        };

        // Repeated keys fold into the first occurrence
        if let Some(&existing) = positions.get(raw.key.as_str()) {
            let target = &mut report.records[existing];
            target.platforms.extend(record.platforms);
            target.genres.extend(record.genres);
            continue;
        }

        let matched = candidates
            .get(&normalize_title(&record.title))
            .and_then(|group| select_candidate(record.year, group));

        match (matched, secondary) {
            (Some(found), Some(source)) => enrich(&mut record, &source.source, found),
            _ => report.unmatched.push(NoMatch {
                id: record.id.clone(),
                title: record.title.clone(),
            }),
        }

        positions.insert(raw.key.as_str(), report.records.len());
        report.records.push(record);
    }

    tracing::debug!(
        records = report.records.len(),
        unmatched = report.unmatched.len(),
        rejected = report.rejected.len(),
        "Merge completed"
    );

    report
}

fn index_by_title(secondary: Option<&RawCollection>) -> HashMap<String, Vec<&RawRecord>> {
    let mut index: HashMap<String, Vec<&RawRecord>> = HashMap::new();
    for record in secondary.map(|c| c.records.as_slice()).unwrap_or_default() {
        if let Some(title) = record.text(attr::TITLE) {
            index.entry(normalize_title(title)).or_default().push(record);
        }
    }
    index
}

/// Picks the candidate whose year is closest to `year`
///
/// Candidates without a year rank after dated ones; equal distances keep input order.
pub fn select_candidate<'a>(year: Option<i32>, candidates: &[&'a RawRecord]) -> Option<&'a RawRecord> {
    candidates
        .iter()
        .copied()
        .min_by_key(|candidate| match (year, candidate.year(attr::YEAR)) {
            (Some(wanted), Some(found)) => u64::from(wanted.abs_diff(found)),
            (Some(_), None) => u64::MAX,
            (None, _) => 0,
        })
}

/// Builds a record from the catalog alone
fn base_record(source: &str, raw: &RawRecord) -> Result<TitleRecord, String> {
    let title = raw
        .text(attr::TITLE)
        .ok_or_else(|| "missing title".to_string())?;
    let title_type = match raw.text(attr::TYPE) {
        Some(kind) => TitleType::parse(kind).ok_or_else(|| format!("unknown type '{}'", kind))?,
        None => return Err("missing type".to_string()),
    };

    let mut record = TitleRecord::new(raw.key.clone(), title, title_type);
    record.year = raw.year(attr::YEAR);
    record.platforms = raw.string_set(attr::PLATFORMS);
    record.genres = raw.string_set(attr::GENRES);
    record.rating = raw.number(attr::RATING).and_then(Rating::new);
    record.votes = raw.number(attr::VOTES).and_then(to_count);
    record.overview = raw.text(attr::OVERVIEW).map(str::to_string);
    record.release_date = raw.text(attr::RELEASE_DATE).map(str::to_string);
    record.popularity = raw.number(attr::POPULARITY);
    record.tmdb_rating = raw.number(attr::TMDB_RATING);
    record.poster_path = raw.text(attr::POSTER_PATH).map(str::to_string);
    record.source_ids = raw.string_map(attr::SOURCE_IDS);
    record
        .source_ids
        .insert(source.to_string(), raw.key.clone());
    if let Some(imdb_id) = raw.text(attr::IMDB_ID) {
        record
            .source_ids
            .insert(IMDB_SOURCE.to_string(), imdb_id.to_string());
    }

    Ok(record)
}

fn enrich(record: &mut TitleRecord, source: &str, found: &RawRecord) {
    if let Some(rating) = found.number(attr::RATING).and_then(Rating::new) {
        record.rating = Some(rating);
    }
    if let Some(votes) = found.number(attr::VOTES).and_then(to_count) {
        record.votes = Some(votes);
    }
    if record.year.is_none() {
        record.year = found.year(attr::YEAR);
    }
    if let Some(imdb_id) = found.text(attr::IMDB_ID) {
        record
            .source_ids
            .entry(IMDB_SOURCE.to_string())
            .or_insert_with(|| imdb_id.to_string());
    }
    record
        .source_ids
        .insert(source.to_string(), found.key.clone());
}

fn to_count(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::to_raw_collection;
    use serde_json::json;

    fn catalog_record(key: &str, title: &str, year: Option<i32>) -> RawRecord {
        RawRecord::new(key)
            .with(attr::TITLE, title)
            .with(attr::TYPE, "movie")
            .with_opt(attr::YEAR, year)
            .with(attr::PLATFORMS, json!(["Netflix"]))
    }

    fn ratings_record(key: &str, title: &str, year: Option<i32>, rating: &str) -> RawRecord {
        RawRecord::new(key)
            .with(attr::TITLE, title)
            .with_opt(attr::YEAR, year)
            .with(attr::RATING, rating)
    }

    #[test]
    fn test_matching_title_gets_rating() {
        let primary = RawCollection::new(
            "tmdb",
            vec![RawRecord::new("tv:1")
                .with(attr::TITLE, "Example Show")
                .with(attr::TYPE, "tv")
                .with(attr::YEAR, 2020)],
        );
        let secondary = RawCollection::new(
            "omdb",
            vec![ratings_record("tt1", "Example Show", Some(2020), "8.2")],
        );

        let report = merge(&primary, Some(&secondary));

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.rating.map(|r| r.value()), Some(8.2));
        assert_eq!(record.title_type, TitleType::TvSeries);
        assert_eq!(record.source_ids["tmdb"], "tv:1");
        assert_eq!(record.source_ids["omdb"], "tt1");
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn test_unmatched_title_has_no_rating() {
        let primary =
            RawCollection::new("tmdb", vec![catalog_record("movie:1", "Lonely Film", Some(2019))]);
        let secondary = RawCollection::new(
            "omdb",
            vec![ratings_record("tt9", "Someone Else", Some(2019), "7.0")],
        );

        let report = merge(&primary, Some(&secondary));

        assert_eq!(report.records.len(), 1);
        assert!(report.records[0].rating.is_none());
        assert!(!report.records[0].source_ids.contains_key("omdb"));
        assert_eq!(
            report.unmatched,
            vec![NoMatch {
                id: "movie:1".to_string(),
                title: "Lonely Film".to_string()
            }]
        );
    }

    #[test]
    fn test_title_normalization() {
        let primary =
            RawCollection::new("tmdb", vec![catalog_record("movie:1", "  The MATRIX ", None)]);
        let secondary =
            RawCollection::new("omdb", vec![ratings_record("tt2", "the matrix", None, "8.7")]);

        let report = merge(&primary, Some(&secondary));
        assert_eq!(report.records[0].title, "The MATRIX");
        assert_eq!(report.records[0].rating.map(|r| r.value()), Some(8.7));
    }

    #[test]
    fn test_closest_year_wins() {
        let primary =
            RawCollection::new("tmdb", vec![catalog_record("movie:1", "Dune", Some(2021))]);
        let secondary = RawCollection::new(
            "omdb",
            vec![
                ratings_record("tt-1984", "Dune", Some(1984), "6.3"),
                ratings_record("tt-2021", "Dune", Some(2021), "8.0"),
                ratings_record("tt-none", "Dune", None, "5.0"),
            ],
        );

        let report = merge(&primary, Some(&secondary));
        assert_eq!(report.records[0].source_ids["omdb"], "tt-2021");
    }

    #[test]
    fn test_year_tie_keeps_first() {
        let first = ratings_record("first", "Twin", Some(2000), "6.0");
        let second = ratings_record("second", "Twin", Some(2002), "7.0");
        let chosen = select_candidate(Some(2001), &[&first, &second]).unwrap();
        assert_eq!(chosen.key, "first");
    }

    #[test]
    fn test_no_primary_year_takes_first_candidate() {
        let first = ratings_record("first", "Twin", Some(2000), "6.0");
        let second = ratings_record("second", "Twin", Some(2002), "7.0");
        let chosen = select_candidate(None, &[&first, &second]).unwrap();
        assert_eq!(chosen.key, "first");
    }

    #[test]
    fn test_dated_candidate_beats_undated() {
        let undated = ratings_record("undated", "Twin", None, "6.0");
        let dated = ratings_record("dated", "Twin", Some(1950), "7.0");
        let chosen = select_candidate(Some(2020), &[&undated, &dated]).unwrap();
        assert_eq!(chosen.key, "dated");
    }

    #[test]
    fn test_out_of_range_rating_is_dropped() {
        let primary =
            RawCollection::new("tmdb", vec![catalog_record("movie:1", "Broken", Some(2000))]);
        let secondary = RawCollection::new(
            "omdb",
            vec![ratings_record("tt1", "Broken", Some(2000), "42")],
        );

        let report = merge(&primary, Some(&secondary));
        assert!(report.records[0].rating.is_none());
    }

    #[test]
    fn test_missing_secondary_leaves_all_unset() {
        let primary = RawCollection::new(
            "tmdb",
            vec![
                catalog_record("movie:1", "A", Some(2000)),
                catalog_record("movie:2", "B", Some(2001)),
            ],
        );

        let report = merge(&primary, None);
        assert_eq!(report.records.len(), 2);
        assert!(report.records.iter().all(|r| r.rating.is_none()));
        assert_eq!(report.unmatched.len(), 2);
    }

    #[test]
    fn test_untitled_and_untyped_records_rejected() {
        let primary = RawCollection::new(
            "tmdb",
            vec![
                RawRecord::new("movie:1").with(attr::TYPE, "movie"),
                RawRecord::new("x:2").with(attr::TITLE, "Odd").with(attr::TYPE, "podcast"),
                catalog_record("movie:3", "Fine", None),
            ],
        );

        let report = merge(&primary, None);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].reason, "missing title");
    }

    #[test]
    fn test_duplicate_primary_keys_fold() {
        let primary = RawCollection::new(
            "tmdb",
            vec![
                catalog_record("movie:1", "Dup", Some(2000)),
                RawRecord::new("movie:1")
                    .with(attr::TITLE, "Dup")
                    .with(attr::TYPE, "movie")
                    .with(attr::PLATFORMS, json!(["Hulu"])),
            ],
        );

        let report = merge(&primary, None);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].platforms.len(), 2);
    }

    #[test]
    fn test_merge_twice_is_identical() {
        let primary = RawCollection::new(
            "tmdb",
            vec![
                catalog_record("movie:1", "Alpha", Some(2000)),
                catalog_record("movie:2", "Beta", None),
            ],
        );
        let secondary =
            RawCollection::new("omdb", vec![ratings_record("tt1", "alpha", Some(2000), "7.5")]);

        assert_eq!(
            merge(&primary, Some(&secondary)),
            merge(&primary, Some(&secondary))
        );
    }

    #[test]
    fn test_remerge_with_empty_secondary_is_identity() {
        let primary = RawCollection::new(
            "tmdb",
            vec![
                catalog_record("movie:1", "Alpha", Some(2000)),
                catalog_record("movie:2", "Beta", None),
            ],
        );
        let secondary = RawCollection::new(
            "omdb",
            vec![RawRecord::new("tt1")
                .with(attr::TITLE, "Alpha")
                .with(attr::YEAR, 2000)
                .with(attr::RATING, 7.5)
                .with(attr::VOTES, "1,200")],
        );

        let merged = merge(&primary, Some(&secondary)).records;
        let again = merge(
            &to_raw_collection("tmdb", &merged),
            Some(&RawCollection::empty("omdb")),
        )
        .records;

        assert_eq!(again, merged);
    }

    #[test]
    fn test_catalog_imdb_id_survives_without_ratings() {
        let primary = RawCollection::new(
            "tmdb",
            vec![catalog_record("movie:27205", "Inception", Some(2010))
                .with(attr::IMDB_ID, "tt1375666")
                .with(attr::TMDB_RATING, 8.4)
                .with(attr::POSTER_PATH, "/inception.jpg")],
        );

        let report = merge(&primary, None);
        let record = &report.records[0];
        assert_eq!(record.imdb_id(), Some("tt1375666"));
        assert_eq!(record.source_ids.get("tmdb").map(String::as_str), Some("movie:27205"));
        assert_eq!(record.tmdb_rating, Some(8.4));
        assert_eq!(record.poster_path.as_deref(), Some("/inception.jpg"));
        assert!(record.rating.is_none());
    }

    #[test]
    fn test_ratings_source_fills_missing_imdb_id() {
        let primary =
            RawCollection::new("tmdb", vec![catalog_record("movie:1", "Alpha", Some(2000))]);
        let secondary = RawCollection::new(
            "omdb",
            vec![ratings_record("tt7", "Alpha", Some(2000), "6.1").with(attr::IMDB_ID, "tt7")],
        );

        let record = &merge(&primary, Some(&secondary)).records[0];
        assert_eq!(record.imdb_id(), Some("tt7"));
        assert_eq!(
            record.imdb_url().as_deref(),
            Some("https://www.imdb.com/title/tt7/")
        );
    }
}
