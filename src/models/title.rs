use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
};

use super::raw::{attr, RawCollection, RawRecord, IMDB_SOURCE};

/// Kind of content a title represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleType {
    Movie,
    TvSeries,
}

impl TitleType {
    /// Parses the spellings used by upstream APIs and query strings
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "movie" | "film" => Some(TitleType::Movie),
            "tv" | "tv-series" | "tv_series" | "series" | "tv show" | "tv-show" => {
                Some(TitleType::TvSeries)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TitleType::Movie => "movie",
            TitleType::TvSeries => "tv-series",
        }
    }
}

impl Display for TitleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rating on the 0.0-10.0 scale
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;

    /// Returns `None` for values outside [0.0, 10.0] or non-finite input
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (Self::MIN..=Self::MAX).contains(&value)).then_some(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Rating {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating {} outside [0, 10]", value))
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// A unified title after merging the catalog and ratings sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub title_type: TitleType,
    pub year: Option<i32>,
    #[serde(default)]
    pub platforms: BTreeSet<String>,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    pub rating: Option<Rating>,
    pub votes: Option<u64>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub popularity: Option<f64>,
    /// TMDB's own vote average, kept apart from the IMDb rating
    pub tmdb_rating: Option<f64>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub source_ids: BTreeMap<String, String>,
}

impl TitleRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, title_type: TitleType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            title_type,
            year: None,
            platforms: BTreeSet::new(),
            genres: BTreeSet::new(),
            rating: None,
            votes: None,
            overview: None,
            release_date: None,
            popularity: None,
            tmdb_rating: None,
            poster_path: None,
            source_ids: BTreeMap::new(),
        }
    }

    pub fn imdb_id(&self) -> Option<&str> {
        self.source_ids.get(IMDB_SOURCE).map(String::as_str)
    }

    /// Title page on IMDb, when the ID is known
    pub fn imdb_url(&self) -> Option<String> {
        self.imdb_id()
            .map(|id| format!("https://www.imdb.com/title/{}/", id))
    }

    /// Converts the record back into the primary-source raw shape
    pub fn to_raw(&self) -> RawRecord {
        let source_ids: serde_json::Map<String, Value> = self
            .source_ids
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();

        RawRecord::new(self.id.clone())
            .with(attr::TITLE, self.title.as_str())
            .with(attr::TYPE, self.title_type.as_str())
            .with_opt(attr::YEAR, self.year)
            .with(attr::PLATFORMS, self.platforms.iter().cloned().collect::<Vec<_>>())
            .with(attr::GENRES, self.genres.iter().cloned().collect::<Vec<_>>())
            .with_opt(attr::RATING, self.rating.map(f64::from))
            .with_opt(attr::VOTES, self.votes)
            .with_opt(attr::OVERVIEW, self.overview.as_deref())
            .with_opt(attr::RELEASE_DATE, self.release_date.as_deref())
            .with_opt(attr::POPULARITY, self.popularity)
            .with_opt(attr::TMDB_RATING, self.tmdb_rating)
            .with_opt(attr::POSTER_PATH, self.poster_path.as_deref())
            .with(attr::SOURCE_IDS, Value::Object(source_ids))
    }
}

/// Wraps already-merged records as a raw collection for the given source
pub fn to_raw_collection(source: &str, records: &[TitleRecord]) -> RawCollection {
    RawCollection::new(source, records.iter().map(TitleRecord::to_raw).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_type_parse() {
        assert_eq!(TitleType::parse("movie"), Some(TitleType::Movie));
        assert_eq!(TitleType::parse("TV Show"), Some(TitleType::TvSeries));
        assert_eq!(TitleType::parse("series"), Some(TitleType::TvSeries));
        assert_eq!(TitleType::parse("tv-series"), Some(TitleType::TvSeries));
        assert_eq!(TitleType::parse("episode"), None);
    }

    #[test]
    fn test_title_type_serde() {
        let json = serde_json::to_string(&TitleType::TvSeries).unwrap();
        assert_eq!(json, "\"tv-series\"");

        let parsed: TitleType = serde_json::from_str("\"movie\"").unwrap();
        assert_eq!(parsed, TitleType::Movie);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0.0).is_some());
        assert!(Rating::new(10.0).is_some());
        assert!(Rating::new(-0.1).is_none());
        assert!(Rating::new(10.1).is_none());
        assert!(Rating::new(f64::NAN).is_none());
    }

    #[test]
    fn test_rating_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("8.2").is_ok());
        assert!(serde_json::from_str::<Rating>("11.0").is_err());
    }

    #[test]
    fn test_record_serializes_type_field() {
        let record = TitleRecord::new("movie:603", "The Matrix", TitleType::Movie);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["platforms"], serde_json::json!([]));
        assert!(json["rating"].is_null());
    }

    #[test]
    fn test_to_raw_carries_fields() {
        let mut record = TitleRecord::new("tv:1399", "Game of Thrones", TitleType::TvSeries);
        record.year = Some(2011);
        record.rating = Rating::new(9.2);
        record.platforms.insert("HBO Max".to_string());
        record
            .source_ids
            .insert("omdb".to_string(), "tt0944947".to_string());

        let raw = record.to_raw();
        assert_eq!(raw.key, "tv:1399");
        assert_eq!(raw.text(attr::TYPE), Some("tv-series"));
        assert_eq!(raw.year(attr::YEAR), Some(2011));
        assert_eq!(raw.number(attr::RATING), Some(9.2));
        assert!(raw.string_set(attr::PLATFORMS).contains("HBO Max"));
        assert_eq!(raw.string_map(attr::SOURCE_IDS)["omdb"], "tt0944947");
    }
}
