/// TMDB catalog provider
///
/// Lists titles currently offered by a fixed set of streaming services and defines the
/// universe of titles for the merged dataset.
///
/// API Flow:
/// 1. Listing: /discover/{movie|tv}?with_watch_providers={id} → paged titles per service
/// 2. Details: /{movie|tv}/{id}?append_to_response=external_ids → genre names + IMDB ID
///
/// A title offered by several services is fetched once and accumulates its platforms.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{attr, RawCollection, RawRecord, PRIMARY_SOURCE},
    services::providers::{FetchRequest, MetadataSource},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

/// Watch providers listed by default, as (TMDB provider ID, display name)
pub const DEFAULT_WATCH_PROVIDERS: &[(u32, &str)] = &[
    (8, "Netflix"),
    (2, "Apple TV"),
    (9, "Amazon Prime"),
    (337, "Disney+"),
    (384, "HBO Max"),
    (15, "Hulu"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Movie,
    Tv,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::Movie, ContentKind::Tv];

    /// Path segment used by the TMDB API, also the raw `type` attribute
    pub fn path(&self) -> &'static str {
        match self {
            ContentKind::Movie => "movie",
            ContentKind::Tv => "tv",
        }
    }
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default = "first_page")]
    total_pages: u32,
    #[serde(default)]
    results: Vec<DiscoverItem>,
}

/// One entry of a discover listing; movies carry `title`, TV shows carry `name`
#[derive(Debug, Clone, Deserialize)]
struct DiscoverItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    first_air_date: Option<String>,
    #[serde(default)]
    popularity: Option<f64>,
    #[serde(default)]
    vote_average: Option<f64>,
    #[serde(default)]
    poster_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TitleDetails {
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(default)]
    imdb_id: Option<String>,
}

/// A failed TMDB call; fatal failures (bad credentials) abort the whole fetch
struct RequestFailure {
    fatal: bool,
    error: AppError,
}

#[derive(Clone)]
pub struct TmdbSource {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    region: String,
    max_pages: u32,
    request_delay: Duration,
    providers: Vec<(u32, String)>,
}

impl TmdbSource {
    pub fn new(
        api_key: String,
        api_url: String,
        region: String,
        max_pages: u32,
        request_delay: Duration,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            region,
            max_pages,
            request_delay,
            providers: DEFAULT_WATCH_PROVIDERS
                .iter()
                .map(|(id, name)| (*id, name.to_string()))
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tmdb_api_key.clone(),
            config.tmdb_api_url.clone(),
            config.watch_region.clone(),
            config.max_pages,
            config.request_delay(),
        )
    }

    /// Replaces the default watch-provider list
    pub fn with_providers(mut self, providers: Vec<(u32, String)>) -> Self {
        self.providers = providers;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RequestFailure> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| RequestFailure {
                fatal: false,
                error: AppError::external(PRIMARY_SOURCE, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure {
                fatal: matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN),
                error: AppError::external(
                    PRIMARY_SOURCE,
                    format!("TMDB API returned status {}: {}", status, body),
                ),
            });
        }

        response.json().await.map_err(|e| RequestFailure {
            fatal: false,
            error: AppError::external(PRIMARY_SOURCE, format!("Failed to parse TMDB response: {}", e)),
        })
    }

    async fn discover(
        &self,
        kind: ContentKind,
        provider_id: u32,
        page: u32,
    ) -> Result<DiscoverPage, RequestFailure> {
        self.get_json(
            &format!("discover/{}", kind.path()),
            &[
                ("with_watch_providers", provider_id.to_string()),
                ("watch_region", self.region.clone()),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn details(&self, kind: ContentKind, id: u64) -> Result<TitleDetails, RequestFailure> {
        self.get_json(
            &format!("{}/{}", kind.path(), id),
            &[("append_to_response", "external_ids".to_string())],
        )
        .await
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for TmdbSource {
    async fn fetch_catalog(&self, _request: &FetchRequest) -> AppResult<RawCollection> {
        let mut builder = CatalogBuilder::default();
        let mut listings_fetched = 0usize;
        let mut last_error = None;

        for kind in ContentKind::ALL {
            for (provider_id, provider_name) in &self.providers {
                let mut page = 1;
                let mut total_pages = 1;

                while page <= total_pages {
                    let listing = match self.discover(kind, *provider_id, page).await {
                        Ok(listing) => listing,
                        Err(failure) if failure.fatal => return Err(failure.error),
                        Err(failure) => {
                            tracing::warn!(
                                error = %failure.error,
                                provider = %provider_name,
                                kind = kind.path(),
                                "Skipping watch provider after failed listing"
                            );
                            last_error = Some(failure.error);
                            break;
                        }
                    };
                    listings_fetched += 1;

                    if page == 1 {
                        total_pages = page_limit(listing.total_pages, self.max_pages);
                    }

                    tracing::info!(
                        provider = %provider_name,
                        kind = kind.path(),
                        page,
                        total_pages,
                        results = listing.results.len(),
                        "Processing watch provider listing"
                    );

                    for item in &listing.results {
                        let Some(index) = builder.add_listing(kind, item, provider_name) else {
                            continue;
                        };

                        self.pause().await;
                        match self.details(kind, item.id).await {
                            Ok(details) => builder.apply_details(index, &details),
                            Err(failure) if failure.fatal => return Err(failure.error),
                            Err(failure) => {
                                tracing::warn!(
                                    error = %failure.error,
                                    tmdb_id = item.id,
                                    "Title details unavailable, keeping listing data"
                                );
                            }
                        }
                    }

                    page += 1;
                    self.pause().await;
                }
            }
        }

        if listings_fetched == 0 {
            if let Some(error) = last_error {
                return Err(error);
            }
        }

        let collection = builder.finish();
        tracing::info!(
            titles = collection.len(),
            provider = PRIMARY_SOURCE,
            "Catalog fetch completed"
        );

        Ok(collection)
    }

    fn name(&self) -> &'static str {
        PRIMARY_SOURCE
    }
}

/// Accumulates listings in first-seen order, folding repeats into one record
#[derive(Default)]
struct CatalogBuilder {
    records: Vec<RawRecord>,
    index: HashMap<String, usize>,
}

impl CatalogBuilder {
    /// Adds a listing; returns the record index only when the title is new
    fn add_listing(&mut self, kind: ContentKind, item: &DiscoverItem, platform: &str) -> Option<usize> {
        let key = listing_key(kind, item.id);

        if let Some(&existing) = self.index.get(&key) {
            add_platform(&mut self.records[existing], platform);
            return None;
        }

        let position = self.records.len();
        self.records.push(listing_record(kind, item, platform));
        self.index.insert(key, position);
        Some(position)
    }

    fn apply_details(&mut self, index: usize, details: &TitleDetails) {
        let Some(record) = self.records.get_mut(index) else {
            return;
        };

        let genres: Vec<String> = details.genres.iter().map(|g| g.name.clone()).collect();
        record.set(attr::GENRES, genres);

        if let Some(imdb_id) = details
            .external_ids
            .as_ref()
            .and_then(|ids| ids.imdb_id.as_deref())
            .filter(|id| !id.is_empty())
        {
            record.set(attr::IMDB_ID, imdb_id);
        }
    }

    fn finish(self) -> RawCollection {
        RawCollection::new(PRIMARY_SOURCE, self.records)
    }
}

/// Pages to walk for one listing; always at least the first
fn page_limit(reported: u32, max_pages: u32) -> u32 {
    reported.min(max_pages).max(1)
}

fn listing_key(kind: ContentKind, id: u64) -> String {
    format!("{}:{}", kind.path(), id)
}

fn listing_record(kind: ContentKind, item: &DiscoverItem, platform: &str) -> RawRecord {
    let (title, date) = match kind {
        ContentKind::Movie => (item.title.as_deref(), item.release_date.as_deref()),
        ContentKind::Tv => (item.name.as_deref(), item.first_air_date.as_deref()),
    };
    let date = date.filter(|d| !d.is_empty());

    RawRecord::new(listing_key(kind, item.id))
        .with_opt(attr::TITLE, title)
        .with(attr::TYPE, kind.path())
        .with_opt(attr::RELEASE_DATE, date)
        .with_opt(attr::YEAR, date.and_then(crate::models::raw::parse_year))
        .with_opt(attr::OVERVIEW, item.overview.as_deref())
        .with_opt(attr::POPULARITY, item.popularity)
        .with_opt(attr::TMDB_RATING, item.vote_average)
        .with_opt(attr::POSTER_PATH, item.poster_path.as_deref().filter(|p| !p.is_empty()))
        .with(attr::PLATFORMS, vec![platform.to_string()])
}

fn add_platform(record: &mut RawRecord, platform: &str) {
    match record.attributes.get_mut(attr::PLATFORMS) {
        Some(Value::Array(items)) => {
            if !items.iter().any(|v| v.as_str() == Some(platform)) {
                items.push(Value::from(platform));
            }
        }
        _ => record.set(attr::PLATFORMS, vec![platform.to_string()]),
    }
}
