/// OMDb ratings provider
///
/// Enriches catalog titles with IMDb ratings and vote counts. Each lookup is resolved by
/// IMDB ID when the catalog knows it, otherwise by title and year.
use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{attr, RawCollection, RawRecord, SECONDARY_SOURCE},
    services::providers::{FetchRequest, Lookup, MetadataSource},
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::{collections::HashSet, time::Duration};

/// OMDb answer for a single title lookup
#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response", default)]
    response: String,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Type", default)]
    title_type: Option<String>,
    #[serde(rename = "imdbRating", default)]
    imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes", default)]
    imdb_votes: Option<String>,
    #[serde(rename = "imdbID", default)]
    imdb_id: Option<String>,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct OmdbSource {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    request_delay: Duration,
}

impl OmdbSource {
    pub fn new(api_key: String, api_url: String, request_delay: Duration) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            request_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.omdb_api_key.clone(),
            config.omdb_api_url.clone(),
            config.request_delay(),
        )
    }

    /// Looks up one title; `Ok(None)` means OMDb answered but knows no such title
    async fn lookup(&self, lookup: &Lookup) -> Result<Option<RawRecord>, LookupFailure> {
        let url = format!("{}/", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(&lookup_params(lookup))
            .send()
            .await
            .map_err(LookupFailure::transient)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupFailure {
                fatal: true,
                error: AppError::external(
                    SECONDARY_SOURCE,
                    format!("OMDb API returned status {}: {}", status, body),
                ),
            });
        }
        if !status.is_success() {
            return Err(LookupFailure::transient(format!(
                "OMDb API returned status {}",
                status
            )));
        }

        let answer: OmdbResponse = response
            .json()
            .await
            .map_err(|e| LookupFailure::transient(format!("Failed to parse OMDb response: {}", e)))?;

        Ok(convert_response(answer, lookup))
    }
}

/// A failed lookup; only bad credentials abort the fetch, anything else skips the title
struct LookupFailure {
    fatal: bool,
    error: AppError,
}

impl LookupFailure {
    fn transient(message: impl std::fmt::Display) -> Self {
        Self {
            fatal: false,
            error: AppError::external(SECONDARY_SOURCE, message),
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for OmdbSource {
    async fn fetch_catalog(&self, request: &FetchRequest) -> AppResult<RawCollection> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;
        let mut last_error = None;

        for lookup in &request.lookups {
            if !seen.insert(lookup_identity(lookup)) {
                continue;
            }
            attempted += 1;

            match self.lookup(lookup).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(failure) if failure.fatal => return Err(failure.error),
                Err(failure) => {
                    tracing::warn!(
                        error = %failure.error,
                        title = %lookup.title,
                        "OMDb lookup failed, leaving title unenriched"
                    );
                    failed += 1;
                    last_error = Some(failure.error);
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        if attempted > 0 && failed == attempted {
            if let Some(error) = last_error {
                return Err(error);
            }
        }

        tracing::info!(
            lookups = request.lookups.len(),
            found = records.len(),
            failed,
            provider = SECONDARY_SOURCE,
            "Ratings fetch completed"
        );

        Ok(RawCollection::new(SECONDARY_SOURCE, records))
    }

    fn name(&self) -> &'static str {
        SECONDARY_SOURCE
    }
}

/// Query parameters for a lookup: by IMDB ID when known, else by title/year/type
fn lookup_params(lookup: &Lookup) -> Vec<(&'static str, String)> {
    if let Some(imdb_id) = &lookup.imdb_id {
        return vec![("i", imdb_id.clone())];
    }

    let mut params = vec![("t", lookup.title.clone())];
    if let Some(year) = lookup.year {
        params.push(("y", year.to_string()));
    }
    match lookup.kind.as_deref().and_then(crate::models::TitleType::parse) {
        Some(crate::models::TitleType::Movie) => params.push(("type", "movie".to_string())),
        Some(crate::models::TitleType::TvSeries) => params.push(("type", "series".to_string())),
        None => {}
    }
    params
}

fn lookup_identity(lookup: &Lookup) -> String {
    match &lookup.imdb_id {
        Some(imdb_id) => imdb_id.clone(),
        None => format!(
            "{}|{}",
            lookup.title.to_lowercase(),
            lookup.year.map(|y| y.to_string()).unwrap_or_default()
        ),
    }
}

fn convert_response(answer: OmdbResponse, lookup: &Lookup) -> Option<RawRecord> {
    if !answer.response.eq_ignore_ascii_case("true") {
        tracing::debug!(
            title = %lookup.title,
            error = answer.error.as_deref().unwrap_or("unknown"),
            "No OMDb match"
        );
        return None;
    }

    let title = answer.title.filter(|t| !t.trim().is_empty())?;
    let key = answer
        .imdb_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| lookup.key.clone());

    let record = RawRecord::new(key)
        .with(attr::TITLE, title)
        .with_opt(attr::YEAR, answer.year.as_deref().and_then(crate::models::raw::parse_year))
        .with_opt(attr::TYPE, answer.title_type)
        .with_opt(attr::RATING, answer.imdb_rating.as_deref().and_then(parse_decimal))
        .with_opt(attr::VOTES, answer.imdb_votes.as_deref().and_then(parse_count))
        .with_opt(attr::IMDB_ID, answer.imdb_id);

    Some(record)
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().parse().ok().filter(|v: &f64| v.is_finite())
}

/// Parses counts such as `"2,345,678"`
fn parse_count(text: &str) -> Option<u64> {
    text.trim().replace(',', "").parse().ok()
}
