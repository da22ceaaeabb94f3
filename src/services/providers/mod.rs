/// Metadata source abstraction
///
/// This module provides a pluggable architecture for the upstream content APIs. The
/// catalog source (TMDB) defines the universe of titles; the ratings source (OMDb)
/// enriches them. Both return raw, loosely typed records that the merger unifies.
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{attr, RawCollection},
};

pub mod omdb;
pub mod tmdb;

/// One title the enrichment source should look up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    /// Primary-source key the lookup was derived from
    pub key: String,
    pub title: String,
    pub year: Option<i32>,
    pub imdb_id: Option<String>,
    /// Raw type string from the primary source
    pub kind: Option<String>,
}

/// Query parameters for a catalog fetch
///
/// The catalog source ignores lookups and lists everything it is configured for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub lookups: Vec<Lookup>,
}

impl FetchRequest {
    /// Request with no parameters, used for the catalog listing
    pub fn catalog() -> Self {
        Self::default()
    }

    /// Builds enrichment lookups from a fetched catalog, skipping untitled records
    pub fn enrichment_for(catalog: &RawCollection) -> Self {
        let lookups = catalog
            .records
            .iter()
            .filter_map(|record| {
                let title = record.text(attr::TITLE)?;
                Some(Lookup {
                    key: record.key.clone(),
                    title: title.to_string(),
                    year: record.year(attr::YEAR),
                    imdb_id: record.text(attr::IMDB_ID).map(str::to_string),
                    kind: record.text(attr::TYPE).map(str::to_string),
                })
            })
            .collect();

        Self { lookups }
    }
}

/// Trait for upstream metadata sources
///
/// Implementations fail with `AppError::ExternalService` on network or authentication
/// failure; the caller decides whether to continue with partial data.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch this source's records for the given request
    async fn fetch_catalog(&self, request: &FetchRequest) -> AppResult<RawCollection>;

    /// Source name for logging and `source_ids`
    fn name(&self) -> &'static str;
}
