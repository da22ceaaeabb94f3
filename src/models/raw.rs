use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Name of the catalog source that defines the universe of titles
pub const PRIMARY_SOURCE: &str = "tmdb";
/// Name of the ratings source used for enrichment
pub const SECONDARY_SOURCE: &str = "omdb";
/// `source_ids` entry holding the IMDb ID, whichever source supplied it
pub const IMDB_SOURCE: &str = "imdb";

/// Attribute names shared by the providers and the merger
pub mod attr {
    pub const TITLE: &str = "title";
    pub const TYPE: &str = "type";
    pub const YEAR: &str = "year";
    pub const RELEASE_DATE: &str = "release_date";
    pub const OVERVIEW: &str = "overview";
    pub const POPULARITY: &str = "popularity";
    pub const PLATFORMS: &str = "platforms";
    pub const GENRES: &str = "genres";
    pub const RATING: &str = "rating";
    pub const VOTES: &str = "votes";
    pub const IMDB_ID: &str = "imdb_id";
    pub const TMDB_RATING: &str = "tmdb_rating";
    pub const POSTER_PATH: &str = "poster_path";
    pub const SOURCE_IDS: &str = "source_ids";
}

/// Placeholder upstream APIs use for missing values
const NOT_AVAILABLE: &str = "N/A";

/// One record as returned by a source: a native key plus loosely typed attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub key: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Everything one source returned for a fetch cycle, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCollection {
    pub source: String,
    pub records: Vec<RawRecord>,
}

impl RawCollection {
    pub fn new(source: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self::new(source, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RawRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            attributes: Map::new(),
        }
    }

    /// Sets an attribute, builder style
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets an attribute only when a value is present
    pub fn with_opt<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set(name, value);
        }
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Non-empty, trimmed string attribute
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty() && s != NOT_AVAILABLE).then_some(s)
            }
            _ => None,
        }
    }

    /// Numeric attribute; numeric strings such as `"8.2"` or `"1,234"` are accepted
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', "").parse().ok(),
            _ => None,
        }
    }

    /// Year attribute; accepts numbers, `"2010"`, `"2008–2013"` and `"2010-07-16"`
    pub fn year(&self, name: &str) -> Option<i32> {
        match self.attributes.get(name)? {
            Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
            Value::String(s) => parse_year(s),
            _ => None,
        }
    }

    /// Set-valued attribute; accepts a JSON array or a comma-separated string
    pub fn string_set(&self, name: &str) -> BTreeSet<String> {
        let clean = |s: &str| {
            let s = s.trim();
            (!s.is_empty() && s != NOT_AVAILABLE).then(|| s.to_string())
        };

        match self.attributes.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(clean)
                .collect(),
            Some(Value::String(s)) => s.split(',').filter_map(clean).collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Map-valued attribute with string values
    pub fn string_map(&self, name: &str) -> BTreeMap<String, String> {
        match self.attributes.get(name) {
            Some(Value::Object(entries)) => entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Extracts a leading four-digit year from free-form date text
pub fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    let digits = text.get(..4)?;
    if digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}
